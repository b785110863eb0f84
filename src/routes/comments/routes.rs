use crate::routes;
use actix_web::web;

pub fn comment_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/get/posts/{id}",
        web::get().to(routes::show_comments_for_post),
    )
    .route("/stream/posts/{id}", web::get().to(routes::stream_comments))
    .route("/live/posts/{id}", web::get().to(routes::live_thread))
    .route("/create", web::post().to(routes::create_comment))
    .route("/like/{id}", web::post().to(routes::like_comment));
}
