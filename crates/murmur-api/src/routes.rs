use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::state::AppState;
use crate::{auth, comments, follows, posts, reports, saves, search};

/// Every API route. Authentication is per handler: routes taking a
/// `Viewer` reject anonymous requests, routes taking a `MaybeViewer`
/// serve them.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/user", get(auth::current_user))
        .route("/user/{id}", get(auth::get_user_profile))
        .route("/setup-profile", post(auth::setup_profile))
        .route("/avatars", get(auth::list_avatars))
        .route("/avatar/{id}", get(auth::get_avatar))
        .route("/avatar", put(auth::set_avatar));

    let post_routes = Router::new()
        .route("/", get(posts::all_posts))
        .route("/create", post(posts::create_post))
        .route("/latest", get(posts::latest_posts))
        .route("/mostliked", get(posts::most_liked_posts))
        .route("/myposts", get(posts::my_posts))
        .route("/author/{user_id}", get(posts::author_posts))
        .route("/delete/{post_id}", delete(posts::delete_post))
        .route("/{post_id}", get(posts::get_post))
        .route("/{post_id}/edit", put(posts::edit_post))
        .route("/{post_id}/like", post(posts::like_post))
        .route("/{post_id}/unlike", delete(posts::unlike_post))
        .route("/{post_id}/likes", get(posts::post_likes));

    let save_routes = Router::new()
        .route("/{post_id}/save", post(saves::toggle_save))
        .route("/saved_posts", get(saves::saved_posts));

    let follow_routes = Router::new()
        .route("/toggle", post(follows::toggle_follow))
        .route("/{user_id}/followers", get(follows::followers))
        .route("/{user_id}/following", get(follows::following));

    // GET/POST take a post id, PUT/DELETE a comment id
    let comment_routes = Router::new().route(
        "/{id}",
        get(comments::list_comments)
            .post(comments::add_comment)
            .put(comments::edit_comment)
            .delete(comments::delete_comment),
    );

    let report_routes = Router::new()
        .route("/", post(reports::create_report).get(reports::list_reports))
        .route("/{report_id}/status", put(reports::update_report_status));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/post", post_routes)
        .nest("/api/save", save_routes)
        .nest("/api/follow", follow_routes)
        .nest("/api/comment", comment_routes)
        .nest("/api/reports", report_routes)
        .route("/api/search", get(search::search))
        .with_state(state)
}
