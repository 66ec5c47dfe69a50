use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::{debug, info};

use super::{
    ModelAdmin, ModelKind,
    records::{self, ChangeListQuery, FormData, Input},
    views::{self, FormContext, InlineRows},
};
use crate::{
    AppState,
    error::{AppError, AppResult},
    models::FieldErrors,
};

type Pairs = Vec<(String, String)>;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/{model}", get(changelist))
        .route("/{model}/add", get(add_form).post(create))
        .route("/{model}/{id}", get(change_form).post(update))
        .route("/{model}/{id}/delete", post(delete))
        .route("/{model}/{id}/draft", post(toggle_draft))
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(views::index_page(&state.admin))
}

/// Resolves a path segment to a registered model.
fn registered<'a>(state: &'a AppState, model: &str) -> AppResult<&'a ModelAdmin> {
    let kind: ModelKind = model.parse().map_err(|_| AppError::NotFound("admin model"))?;
    state.admin.get(kind).ok_or(AppError::NotFound("admin model"))
}

async fn changelist(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
    Query(pairs): Query<Pairs>,
) -> AppResult<Html<String>> {
    let admin = registered(&state, &model)?;
    let query = ChangeListQuery::from_pairs(pairs);
    let list = records::changelist(state.catalog.db(), admin, &query).await?;
    Ok(Html(views::changelist_page(&state.admin, admin, &list, &query)))
}

async fn add_form(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
    Query(pairs): Query<Pairs>,
) -> AppResult<Response> {
    let admin = registered(&state, &model)?;
    let values = initial_values(admin.kind, pairs);
    render_form(&state, admin, None, &values, &FieldErrors::new(), StatusCode::OK).await
}

/// Field defaults, overridden by matching query parameters such as `?movie=3`.
fn initial_values(kind: ModelKind, pairs: Pairs) -> FormData {
    let mut values = FormData::default();
    for field in records::fields(kind) {
        if let Input::Number { default } = field.input {
            values.set(field.name, default.to_string());
        }
    }
    for (name, value) in pairs {
        if let Some(field) = records::field(kind, &name).filter(|f| !f.is_computed()) {
            values.set(field.name, value);
        }
    }
    values
}

async fn create(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
    Form(pairs): Form<Pairs>,
) -> AppResult<Response> {
    let admin = registered(&state, &model)?;
    let form = FormData::new(pairs);

    match records::save(state.catalog.db(), admin.kind, None, &form).await? {
        Ok(id) => {
            info!(model = %admin.kind, id, "admin record added");
            Ok(after_save(admin.kind, id, &form))
        },
        Err(errors) => {
            debug!(model = %admin.kind, fields = ?errors, "admin add rejected");
            render_form(&state, admin, None, &form, &errors, StatusCode::UNPROCESSABLE_ENTITY).await
        },
    }
}

async fn change_form(
    State(state): State<Arc<AppState>>,
    Path((model, id)): Path<(String, i32)>,
) -> AppResult<Response> {
    let admin = registered(&state, &model)?;
    let values = records::load(state.catalog.db(), admin.kind, id)
        .await?
        .ok_or(AppError::NotFound("record"))?;
    render_form(&state, admin, Some(id), &values, &FieldErrors::new(), StatusCode::OK).await
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path((model, id)): Path<(String, i32)>,
    Form(pairs): Form<Pairs>,
) -> AppResult<Response> {
    let admin = registered(&state, &model)?;
    let db = state.catalog.db();
    let current = records::load(db, admin.kind, id).await?.ok_or(AppError::NotFound("record"))?;
    let mut form = FormData::new(pairs);

    let save_as_new = admin.save_as && form.contains("_saveasnew");
    if !save_as_new {
        let readonly: Vec<&str> = admin
            .readonly_fields
            .iter()
            .copied()
            .filter(|name| records::field(admin.kind, name).is_some_and(|f| !f.is_computed()))
            .collect();
        form.keep_from(&readonly, &current);
    }

    let target = if save_as_new { None } else { Some(id) };
    match records::save(db, admin.kind, target, &form).await? {
        Ok(saved) => {
            if save_as_new {
                info!(model = %admin.kind, from = id, id = saved, "admin record saved as new");
                return Ok(Redirect::to(&admin.kind.change_url(saved)).into_response());
            }
            info!(model = %admin.kind, id, "admin record changed");
            Ok(after_save(admin.kind, saved, &form))
        },
        Err(errors) => {
            debug!(model = %admin.kind, id, fields = ?errors, "admin change rejected");
            let shown = if save_as_new { None } else { Some(id) };
            render_form(&state, admin, shown, &form, &errors, StatusCode::UNPROCESSABLE_ENTITY).await
        },
    }
}

fn after_save(kind: ModelKind, id: i32, form: &FormData) -> Response {
    let to = if form.contains("_continue") {
        kind.change_url(id)
    } else if form.contains("_addanother") {
        kind.add_url()
    } else {
        kind.changelist_url()
    };
    Redirect::to(&to).into_response()
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path((model, id)): Path<(String, i32)>,
) -> AppResult<Redirect> {
    let admin = registered(&state, &model)?;
    if !records::delete(state.catalog.db(), admin.kind, id).await? {
        return Err(AppError::NotFound("record"));
    }
    info!(model = %admin.kind, id, "admin record deleted");
    Ok(Redirect::to(&admin.kind.changelist_url()))
}

async fn toggle_draft(
    State(state): State<Arc<AppState>>,
    Path((model, id)): Path<(String, i32)>,
) -> AppResult<Redirect> {
    let admin = registered(&state, &model)?;
    if admin.kind != ModelKind::Movie || !admin.is_editable_in_list("draft") {
        return Err(AppError::NotFound("admin action"));
    }
    let draft = records::toggle_draft(state.catalog.db(), id)
        .await?
        .ok_or(AppError::NotFound("record"))?;
    info!(id, draft, "movie draft toggled");
    Ok(Redirect::to(&admin.kind.changelist_url()))
}

async fn render_form(
    state: &AppState,
    admin: &ModelAdmin,
    id: Option<i32>,
    values: &FormData,
    errors: &FieldErrors,
    status: StatusCode,
) -> AppResult<Response> {
    let db = state.catalog.db();

    let mut choices = HashMap::new();
    for field in records::fields(admin.kind) {
        let model = match field.input {
            Input::Select { model } | Input::MultiSelect { model } => model,
            _ => continue,
        };
        if !choices.contains_key(&model) {
            choices.insert(model, records::choices(db, model).await?);
        }
    }

    let mut inlines = Vec::new();
    if let Some(id) = id {
        for inline in &admin.inlines {
            let columns: Vec<&'static str> = records::fields(inline.kind)
                .iter()
                .filter(|f| f.name != "movie")
                .filter(|f| !f.is_computed() || inline.readonly_fields.contains(&f.name))
                .map(|f| f.name)
                .collect();
            let query = ChangeListQuery::by_movie(id);
            let rows = records::rows(db, inline.kind, &columns, &[], &query).await?;
            inlines.push(InlineRows { inline: inline.clone(), columns, rows });
        }
    }

    let ctx = FormContext { id, values, errors, choices: &choices, inlines: &inlines };
    Ok((status, Html(views::change_form_page(&state.admin, admin, &ctx))).into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        catalog::fixtures,
        db::test_db,
        entities::{genre, movie, review},
        routes::tests::{body_text, form_post, test_app},
    };

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn index_lists_registered_models() {
        let db = test_db().await;
        let resp = test_app(db).oneshot(get("/admin")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("/admin/movie"));
        assert!(body.contains("Rating stars"));
    }

    #[tokio::test]
    async fn unknown_model_is_not_found() {
        let db = test_db().await;
        let resp = test_app(db).oneshot(get("/admin/users")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn add_redirects_by_button() {
        let db = test_db().await;
        let app = test_app(db.clone());

        let resp = app
            .clone()
            .oneshot(form_post("/admin/genre/add", "name=Drama&description=d&url=drama&_save=1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/admin/genre");

        let resp = app
            .oneshot(form_post("/admin/genre/add", "name=Noir&description=d&url=noir&_continue=1"))
            .await
            .unwrap();
        let noir = genre::Entity::find_by_id(2).one(&db).await.unwrap().unwrap();
        assert_eq!(noir.url, "noir");
        assert_eq!(resp.headers()[header::LOCATION], "/admin/genre/2");
    }

    #[tokio::test]
    async fn invalid_add_rerenders_with_errors() {
        let db = test_db().await;
        let resp = test_app(db.clone())
            .oneshot(form_post("/admin/genre/add", "name=&description=d&url=not+a+slug"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_text(resp).await;
        assert!(body.contains("This field is required."));
        assert_eq!(genre::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn add_form_prefills_from_query() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;

        let resp = test_app(db).oneshot(get(&format!("/admin/movieshots/add?movie={}", movie.id))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(&format!("<option value=\"{}\" selected>Movie heat</option>", movie.id)));
    }

    #[tokio::test]
    async fn review_identity_survives_admin_edit() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;
        let review = fixtures::review(&db, movie.id, None).await;

        let body = format!("name=Mallory&email=mallory%40x.com&text=Edited&parent=&movie={}", movie.id);
        let resp = test_app(db.clone())
            .oneshot(form_post(&format!("/admin/reviews/{}", review.id), &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let saved = review::Entity::find_by_id(review.id).one(&db).await.unwrap().unwrap();
        assert_eq!(saved.name, "Viewer");
        assert_eq!(saved.email, "viewer@example.com");
        assert_eq!(saved.text, "Edited");
    }

    #[tokio::test]
    async fn movie_change_form_shows_inlines() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;
        fixtures::review(&db, movie.id, None).await;

        let resp = test_app(db).oneshot(get(&format!("/admin/movie/{}", movie.id))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(&format!("/admin/movieshots/add?movie={}", movie.id)));
        assert!(body.contains("viewer@example.com"));
        assert!(body.contains("_saveasnew"));
    }

    #[tokio::test]
    async fn save_as_new_copies_the_movie() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;

        let body = "title=Heat+2&description=Again.&poster=movies%2Fheat.jpg&year=2020&country=US\
                    &budget=0&fees_in_usa=0&fees_in_world=0&url=heat-2&_saveasnew=1";
        let resp = test_app(db.clone())
            .oneshot(form_post(&format!("/admin/movie/{}", movie.id), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], format!("/admin/movie/{}", movie.id + 1));

        let original = movie::Entity::find_by_id(movie.id).one(&db).await.unwrap().unwrap();
        assert_eq!(original.url, "heat");
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn draft_toggle_and_delete() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;
        let app = test_app(db.clone());

        let resp = app.clone().oneshot(form_post(&format!("/admin/movie/{}/draft", movie.id), "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let saved = movie::Entity::find_by_id(movie.id).one(&db).await.unwrap().unwrap();
        assert!(saved.draft);

        let resp = app.clone().oneshot(form_post("/admin/genre/1/draft", "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app.clone().oneshot(form_post(&format!("/admin/movie/{}/delete", movie.id), "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 0);

        let resp = app.oneshot(form_post(&format!("/admin/movie/{}/delete", movie.id), "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
