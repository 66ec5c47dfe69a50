use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{ConnectInfo, Form, FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tracing::{debug, info};

use crate::{
    AppState, admin,
    error::{AppError, AppResult},
    models::{RatingSubmission, ReviewFormState, ReviewSubmission},
    templates,
};

const MAX_IP_LEN: usize = 15;

pub fn router(state: Arc<AppState>) -> Router {
    let media = ServeDir::new(&state.config.media_root);

    Router::new()
        .route("/", get(movie_list))
        .route("/movie/{slug}", get(movie_detail))
        .route("/review/{movie_id}", post(add_review))
        .route("/rating/{movie_id}", post(add_rating))
        .nest("/admin", admin::routes::router())
        .nest_service(&state.config.media_url, media)
        .with_state(state)
}

pub async fn movie_list(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let movies = state.catalog.published_movies().await?;
    Ok(Html(templates::movie_list_page(&state.config, &movies)))
}

/// `?parent=<id>` preselects the review being replied to.
pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(reply): Query<ReviewSubmission>,
) -> AppResult<Html<String>> {
    let movie = state.catalog.movie_by_slug(&slug).await?.ok_or(AppError::NotFound("movie"))?;
    let detail = state.catalog.movie_detail(movie).await?;
    let form_state = ReviewFormState {
        values: ReviewSubmission { parent: reply.parent, ..Default::default() },
        ..Default::default()
    };
    Ok(Html(templates::movie_detail_page(&state.config, &detail, &form_state)))
}

/// Unknown movie ids are not mapped to 404 here; the miss surfaces as an internal
/// error, same as any other failed lookup on this write path.
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    Form(submission): Form<ReviewSubmission>,
) -> AppResult<Response> {
    let movie = state
        .catalog
        .movie_by_id(movie_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("movie {movie_id} does not exist"))?;

    let form = match submission.clean() {
        Ok(form) => form,
        Err(errors) => {
            debug!(movie_id, fields = ?errors, "review rejected");
            let detail = state.catalog.movie_detail(movie).await?;
            let form_state = ReviewFormState { values: submission, errors };
            let body = templates::movie_detail_page(&state.config, &detail, &form_state);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(body)).into_response());
        },
    };

    let review = state.catalog.add_review(movie.id, form).await?;
    info!(movie_id, review_id = review.id, parent_id = ?review.parent_id, "review added");

    Ok(Redirect::to(&movie.absolute_url()).into_response())
}

pub async fn add_rating(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    ClientIp(ip): ClientIp,
    Form(submission): Form<RatingSubmission>,
) -> AppResult<Response> {
    let movie = state.catalog.movie_by_id(movie_id).await?.ok_or(AppError::NotFound("movie"))?;

    let star = match submission.star_id() {
        Some(id) => state.catalog.rating_star(id).await?,
        None => None,
    };
    let Some(star) = star else {
        let body = templates::error_page("Choose one of the rating stars.".to_string());
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(body)).into_response());
    };

    state.catalog.rate(movie.id, &ip, star.id).await?;
    info!(movie_id, ip = %ip, star = star.value, "rating recorded");

    Ok(Redirect::to(&movie.absolute_url()).into_response())
}

/// Client address: proxy headers first, then the socket peer. Cut to the 15
/// characters the ratings table stores, so IPv6 clients sharing a prefix share a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let ip = header("x-forwarded-for")
            .or_else(|| header("x-real-ip"))
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientIp(ip.chars().take(MAX_IP_LEN).collect()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        admin::AdminSite,
        catalog::{Catalog, fixtures},
        config::test_config,
        db::test_db,
        entities::{rating, review},
    };

    pub fn test_app(db: DatabaseConnection) -> Router {
        let config = Arc::new(test_config());
        let state = Arc::new(AppState {
            admin: Arc::new(AdminSite::from_config(&config)),
            config,
            catalog: Catalog::new(db),
        });
        router(state)
    }

    pub async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn list_shows_only_published_movies() {
        let db = test_db().await;
        fixtures::movie(&db, "visible-film", false).await;
        fixtures::movie(&db, "secret-film", true).await;

        let resp = test_app(db).oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("/movie/visible-film"));
        assert!(!body.contains("secret-film"));
    }

    #[tokio::test]
    async fn detail_renders_top_level_reviews() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;
        let root = fixtures::review(&db, movie.id, None).await;
        fixtures::review(&db, movie.id, Some(root.id)).await;

        let resp = test_app(db).oneshot(get("/movie/heat")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Movie heat"));
        assert!(body.contains(&format!("id=\"review-{}\"", root.id)));
    }

    #[tokio::test]
    async fn reply_link_preselects_parent() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;
        let root = fixtures::review(&db, movie.id, None).await;

        let resp = test_app(db).oneshot(get(&format!("/movie/heat?parent={}", root.id))).await.unwrap();
        let body = body_text(resp).await;
        assert!(body.contains(&format!("name=\"parent\" value=\"{}\"", root.id)));
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let db = test_db().await;
        fixtures::movie(&db, "heat", false).await;

        let resp = test_app(db).oneshot(get("/movie/ronin")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn valid_review_is_stored_and_redirects() {
        let db = test_db().await;
        for slug in ["a", "b", "c", "d"] {
            fixtures::movie(&db, slug, false).await;
        }
        let movie = fixtures::movie(&db, "fifth", false).await;
        assert_eq!(movie.id, 5);

        let resp = test_app(db.clone())
            .oneshot(form_post("/review/5", "name=Jane&email=jane%40x.com&text=Great+film"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/movie/fifth");

        let rows = review::Entity::find().all(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].movie_id, 5);
        assert_eq!(rows[0].parent_id, None);
        assert_eq!(rows[0].name, "Jane");
    }

    #[tokio::test]
    async fn reply_keeps_parent_from_another_movie() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let other = fixtures::movie(&db, "o", false).await;
        let foreign = fixtures::review(&db, other.id, None).await;

        let body = format!("name=Jo&email=jo%40x.com&text=Agreed&parent={}", foreign.id);
        let resp = test_app(db.clone())
            .oneshot(form_post(&format!("/review/{}", movie.id), &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let reply = review::Entity::find_by_id(foreign.id + 1).one(&db).await.unwrap().unwrap();
        assert_eq!(reply.movie_id, movie.id);
        assert_eq!(reply.parent_id, Some(foreign.id));
    }

    #[tokio::test]
    async fn invalid_review_rerenders_with_errors() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;

        let resp = test_app(db.clone())
            .oneshot(form_post(&format!("/review/{}", movie.id), "name=&email=bad&text="))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(resp.headers().get(header::LOCATION).is_none());
        let body = body_text(resp).await;
        assert!(body.contains("Enter a valid email address."));
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reply_links_survive_a_rejected_review() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;
        let root = fixtures::review(&db, movie.id, None).await;
        let app = test_app(db);

        let resp = app
            .clone()
            .oneshot(form_post(&format!("/review/{}", movie.id), "name=&email=bad&text="))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_text(resp).await;
        let reply = format!("/movie/heat?parent={}", root.id);
        assert!(body.contains(&format!("href=\"{reply}#review-form\"")));

        let resp = app.oneshot(get(&reply)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(&format!("name=\"parent\" value=\"{}\"", root.id)));
    }

    #[tokio::test]
    async fn review_for_missing_movie_is_an_internal_error() {
        let db = test_db().await;

        let resp = test_app(db.clone())
            .oneshot(form_post("/review/99", "name=Jane&email=jane%40x.com&text=Hi"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rating_uses_forwarded_ip() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let star = fixtures::star(&db, 4).await;

        let mut req = form_post(&format!("/rating/{}", movie.id), &format!("star={}", star.id));
        req.headers_mut().insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let resp = test_app(db.clone()).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let rows = rating::Entity::find().all(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ip, "203.0.113.7");
        assert_eq!(rows[0].star_id, star.id);
    }

    #[tokio::test]
    async fn client_ip_is_cut_to_column_width() {
        let (mut parts, _) = Request::builder()
            .header("x-forwarded-for", "2001:db8:85a3::8a2e:370:7334")
            .body(())
            .unwrap()
            .into_parts();
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, "2001:db8:85a3::");

        let (mut parts, _) = Request::builder()
            .header("x-real-ip", "198.51.100.23")
            .body(())
            .unwrap()
            .into_parts();
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, "198.51.100.23");
    }

    #[tokio::test]
    async fn rating_with_unknown_star_is_rejected() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;

        let resp = test_app(db.clone())
            .oneshot(form_post(&format!("/rating/{}", movie.id), "star=7"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(rating::Entity::find().count(&db).await.unwrap(), 0);
    }
}
