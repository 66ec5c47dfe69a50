//! Field metadata and persistence for every admin model.
//!
//! Records travel as [`FormData`]: field name to string values, the same shape a
//! browser posts. Loading a row fills one; saving cleans one back into an
//! active model.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use validator::ValidateEmail;

use super::{ModelAdmin, ModelKind};
use crate::{
    entities::{
        actor, category, genre, movie, movie_actor, movie_director, movie_genre, movie_shot, rating,
        rating_star, review,
    },
    error::AppResult,
    models::FieldErrors,
};

/// Pseudo-field for a record's display string.
pub const DISPLAY: &str = "__str__";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Text { max: usize },
    TextArea { max: Option<usize> },
    Slug { max: usize },
    Email,
    /// Non-negative `i32`.
    Number { default: i32 },
    /// Non-negative `i64`.
    BigNumber,
    Checkbox,
    Date,
    Image { upload_to: &'static str },
    Select { model: ModelKind },
    MultiSelect { model: ModelKind },
    /// Read-only preview of another image field.
    Thumbnail { source: &'static str, width: u32, height: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub input: Input,
    pub required: bool,
    pub help: Option<&'static str>,
}

impl Field {
    const fn new(name: &'static str, label: &'static str, input: Input) -> Self {
        Self { name, label, input, required: true, help: None }
    }

    const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    const fn help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.input, Input::Thumbnail { .. })
    }
}

const DOLLARS: &str = "Please mention in $";

static CATEGORY_FIELDS: &[Field] = &[
    Field::new("name", "Category", Input::Text { max: 150 }),
    Field::new("description", "Description", Input::TextArea { max: None }).optional(),
    Field::new("url", "Url", Input::Slug { max: 160 }),
];

static GENRE_FIELDS: &[Field] = &[
    Field::new("name", "Genre", Input::Text { max: 100 }),
    Field::new("description", "Description", Input::TextArea { max: None }),
    Field::new("url", "Url", Input::Slug { max: 160 }),
];

static ACTOR_FIELDS: &[Field] = &[
    Field::new("name", "Name", Input::Text { max: 100 }),
    Field::new("age", "Age", Input::Number { default: 0 }),
    Field::new("description", "Description", Input::TextArea { max: None }),
    Field::new("image", "Image", Input::Image { upload_to: "actors/" }),
    Field::new("thumbnail", "Image", Input::Thumbnail { source: "image", width: 50, height: 60 }),
];

static MOVIE_FIELDS: &[Field] = &[
    Field::new("title", "Title", Input::Text { max: 100 }),
    Field::new("tagline", "Slogan", Input::Text { max: 100 }).optional(),
    Field::new("description", "Description", Input::TextArea { max: None }),
    Field::new("poster", "Poster", Input::Image { upload_to: "movies/" }),
    Field::new("thumbnail", "Poster", Input::Thumbnail { source: "poster", width: 100, height: 110 }),
    Field::new("year", "Release date", Input::Number { default: 2020 }),
    Field::new("country", "Country", Input::Text { max: 30 }),
    Field::new("directors", "Directors", Input::MultiSelect { model: ModelKind::Actor }).optional(),
    Field::new("actors", "Actors", Input::MultiSelect { model: ModelKind::Actor }).optional(),
    Field::new("genres", "Genres", Input::MultiSelect { model: ModelKind::Genre }).optional(),
    Field::new("world_premiere", "World release", Input::Date).optional(),
    Field::new("budget", "Budget", Input::BigNumber).help(DOLLARS),
    Field::new("fees_in_usa", "US Box office", Input::BigNumber).help(DOLLARS),
    Field::new("fees_in_world", "World Box office", Input::BigNumber).help(DOLLARS),
    Field::new("category", "Category", Input::Select { model: ModelKind::Category }).optional(),
    Field::new("url", "Url", Input::Slug { max: 130 }),
    Field::new("draft", "Draft", Input::Checkbox).optional(),
];

static MOVIE_SHOT_FIELDS: &[Field] = &[
    Field::new("title", "Title", Input::Text { max: 100 }),
    Field::new("description", "Description", Input::TextArea { max: None }),
    Field::new("image", "Image", Input::Image { upload_to: "movie_shots/" }),
    Field::new("movie", "Film", Input::Select { model: ModelKind::Movie }),
    Field::new("thumbnail", "Image", Input::Thumbnail { source: "image", width: 50, height: 60 }),
];

static RATING_STAR_FIELDS: &[Field] = &[Field::new("value", "Value", Input::Number { default: 0 })];

static RATING_FIELDS: &[Field] = &[
    Field::new("ip", "IP address", Input::Text { max: 15 }),
    Field::new("star", "Star", Input::Select { model: ModelKind::RatingStar }),
    Field::new("movie", "Film", Input::Select { model: ModelKind::Movie }),
];

static REVIEW_FIELDS: &[Field] = &[
    Field::new("email", "Email", Input::Email),
    Field::new("name", "Name", Input::Text { max: 100 }),
    Field::new("text", "Message", Input::TextArea { max: Some(5000) }),
    Field::new("parent", "Parent", Input::Select { model: ModelKind::Reviews }).optional(),
    Field::new("movie", "Film", Input::Select { model: ModelKind::Movie }),
];

pub fn fields(kind: ModelKind) -> &'static [Field] {
    match kind {
        ModelKind::Category => CATEGORY_FIELDS,
        ModelKind::Genre => GENRE_FIELDS,
        ModelKind::Actor => ACTOR_FIELDS,
        ModelKind::Movie => MOVIE_FIELDS,
        ModelKind::MovieShots => MOVIE_SHOT_FIELDS,
        ModelKind::RatingStar => RATING_STAR_FIELDS,
        ModelKind::Rating => RATING_FIELDS,
        ModelKind::Reviews => REVIEW_FIELDS,
    }
}

pub fn field(kind: ModelKind, name: &str) -> Option<&'static Field> {
    fields(kind).iter().find(|f| f.name == name)
}

/// Column header for a list or inline column.
pub fn label(kind: ModelKind, name: &str) -> &'static str {
    match name {
        DISPLAY => kind.verbose_name(),
        "id" => "ID",
        _ => field(kind, name).map(|f| f.label).unwrap_or("?"),
    }
}

/// Ordered multi-map of submitted or loaded values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn values(&self, name: &str) -> Vec<&str> {
        self.0.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k == name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.0.push((name.to_string(), value.into()));
    }

    pub fn set_many(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        self.remove(name);
        self.0.extend(values.into_iter().map(|v| (name.to_string(), v)));
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(k, _)| k != name);
    }

    /// Replaces `fields` with the values in `current`, discarding anything submitted.
    pub fn keep_from(&mut self, fields: &[&str], current: &FormData) {
        for name in fields {
            let values = current.values(name).into_iter().map(str::to_string).collect::<Vec<_>>();
            self.set_many(name, values);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeListQuery {
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
}

impl ChangeListQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            if key == "q" {
                query.search = Some(value);
            } else {
                query.filters.push((key, value));
            }
        }
        query
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn filter_id(&self, name: &str) -> Option<i32> {
        self.filter(name).and_then(|v| v.parse().ok())
    }

    pub fn by_movie(movie_id: i32) -> Self {
        Self { search: None, filters: vec![("movie".to_string(), movie_id.to_string())] }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Bool(bool),
    Image { path: String, width: u32, height: u32 },
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub id: i32,
    pub cells: Vec<(&'static str, Cell)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListFilter {
    pub field: &'static str,
    pub label: &'static str,
    pub options: Vec<(String, String)>,
    pub selected: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChangeList {
    pub rows: Vec<Row>,
    pub filters: Vec<ListFilter>,
}

pub async fn changelist(
    db: &DatabaseConnection,
    admin: &ModelAdmin,
    query: &ChangeListQuery,
) -> AppResult<ChangeList> {
    let rows = rows(db, admin.kind, &admin.list_display, &admin.search_fields, query).await?;

    let mut filters = Vec::new();
    for name in &admin.list_filter {
        let options = filter_options(db, admin.kind, name).await?;
        filters.push(ListFilter {
            field: name,
            label: label(admin.kind, name),
            options,
            selected: query.filter(name).map(str::to_string),
        });
    }

    Ok(ChangeList { rows, filters })
}

async fn filter_options(
    db: &DatabaseConnection,
    kind: ModelKind,
    name: &str,
) -> AppResult<Vec<(String, String)>> {
    if let Some(Input::Select { model }) = field(kind, name).map(|f| f.input) {
        let options = choices(db, model).await?;
        return Ok(options.into_iter().map(|(id, label)| (id.to_string(), label)).collect());
    }

    match (kind, name) {
        (ModelKind::Movie, "year") => {
            let years = movie::Entity::find()
                .select_only()
                .column(movie::Column::Year)
                .distinct()
                .order_by_desc(movie::Column::Year)
                .into_tuple::<i32>()
                .all(db)
                .await?;
            Ok(years.into_iter().map(|y| (y.to_string(), y.to_string())).collect())
        },
        _ => Ok(Vec::new()),
    }
}

/// Rows of `kind` with one cell per column, after search and filters.
pub async fn rows(
    db: &DatabaseConnection,
    kind: ModelKind,
    columns: &[&'static str],
    search_fields: &[&'static str],
    query: &ChangeListQuery,
) -> AppResult<Vec<Row>> {
    let search = query.search.as_deref().filter(|_| !search_fields.is_empty());
    let records = fetch(db, kind, search.map(|q| (q, search_fields)), query).await?;

    let display: HashMap<i32, String> = choices(db, kind).await?.into_iter().collect();
    let mut related: HashMap<ModelKind, HashMap<i32, String>> = HashMap::new();
    for name in columns {
        if let Some(Input::Select { model }) = field(kind, name).map(|f| f.input) {
            if !related.contains_key(&model) {
                related.insert(model, choices(db, model).await?.into_iter().collect());
            }
        }
    }

    let rows = records
        .into_iter()
        .map(|(id, values)| Row {
            id,
            cells: columns
                .iter()
                .map(|name| (*name, cell(kind, name, id, &values, &display, &related)))
                .collect(),
        })
        .collect();
    Ok(rows)
}

fn cell(
    kind: ModelKind,
    name: &str,
    id: i32,
    values: &FormData,
    display: &HashMap<i32, String>,
    related: &HashMap<ModelKind, HashMap<i32, String>>,
) -> Cell {
    match name {
        "id" => return Cell::Text(id.to_string()),
        DISPLAY => return display.get(&id).cloned().map(Cell::Text).unwrap_or(Cell::Empty),
        _ => {},
    }
    let Some(field) = field(kind, name) else {
        return Cell::Empty;
    };
    let raw = values.get(name).unwrap_or("");
    match field.input {
        Input::Checkbox => Cell::Bool(raw == "true"),
        Input::Select { model } => raw
            .parse::<i32>()
            .ok()
            .and_then(|fk| related.get(&model).and_then(|m| m.get(&fk)).cloned())
            .map(Cell::Text)
            .unwrap_or(Cell::Empty),
        Input::Thumbnail { source, width, height } => match values.get(source) {
            Some(path) if !path.is_empty() => Cell::Image { path: path.to_string(), width, height },
            _ => Cell::Empty,
        },
        _ if raw.is_empty() => Cell::Empty,
        _ => Cell::Text(raw.to_string()),
    }
}

/// `(id, display string)` for every row of `kind`, in id order.
pub async fn choices(db: &DatabaseConnection, kind: ModelKind) -> AppResult<Vec<(i32, String)>> {
    let out = match kind {
        ModelKind::Category => category::Entity::find()
            .order_by_asc(category::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.to_string()))
            .collect(),
        ModelKind::Genre => genre::Entity::find()
            .order_by_asc(genre::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.to_string()))
            .collect(),
        ModelKind::Actor => actor::Entity::find()
            .order_by_asc(actor::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.to_string()))
            .collect(),
        ModelKind::Movie => movie_titles(db).await?,
        ModelKind::MovieShots => movie_shot::Entity::find()
            .order_by_asc(movie_shot::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.to_string()))
            .collect(),
        ModelKind::RatingStar => rating_star::Entity::find()
            .order_by_asc(rating_star::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.to_string()))
            .collect(),
        ModelKind::Rating => {
            let titles: HashMap<i32, String> = movie_titles(db).await?.into_iter().collect();
            let stars: HashMap<i32, i32> = rating_star::Entity::find()
                .all(db)
                .await?
                .into_iter()
                .map(|s| (s.id, s.value))
                .collect();
            rating::Entity::find()
                .order_by_asc(rating::Column::Id)
                .all(db)
                .await?
                .into_iter()
                .map(|r| {
                    let star = stars.get(&r.star_id).map(i32::to_string).unwrap_or_default();
                    let title = titles.get(&r.movie_id).cloned().unwrap_or_default();
                    (r.id, format!("{star} - {title}"))
                })
                .collect()
        },
        ModelKind::Reviews => {
            let titles: HashMap<i32, String> = movie_titles(db).await?.into_iter().collect();
            review::Entity::find()
                .order_by_asc(review::Column::Id)
                .all(db)
                .await?
                .into_iter()
                .map(|r| {
                    let title = titles.get(&r.movie_id).cloned().unwrap_or_default();
                    (r.id, format!("{} - {}", r.name, title))
                })
                .collect()
        },
    };
    Ok(out)
}

async fn movie_titles(db: &DatabaseConnection) -> Result<Vec<(i32, String)>, DbErr> {
    movie::Entity::find()
        .select_only()
        .column(movie::Column::Id)
        .column(movie::Column::Title)
        .order_by_asc(movie::Column::Id)
        .into_tuple::<(i32, String)>()
        .all(db)
        .await
}

async fn fetch(
    db: &DatabaseConnection,
    kind: ModelKind,
    search: Option<(&str, &[&'static str])>,
    query: &ChangeListQuery,
) -> AppResult<Vec<(i32, FormData)>> {
    let records = match kind {
        ModelKind::Category => {
            let mut select = category::Entity::find().order_by_asc(category::Column::Id);
            if let Some((q, fields)) = search {
                let mut any = Condition::any();
                for name in fields {
                    match *name {
                        "name" => any = any.add(category::Column::Name.contains(q)),
                        "url" => any = any.add(category::Column::Url.contains(q)),
                        _ => {},
                    }
                }
                select = select.filter(any);
            }
            select.all(db).await?.iter().map(|m| (m.id, category_values(m))).collect()
        },
        ModelKind::Genre => {
            let mut select = genre::Entity::find().order_by_asc(genre::Column::Id);
            if let Some((q, fields)) = search {
                let mut any = Condition::any();
                for name in fields {
                    match *name {
                        "name" => any = any.add(genre::Column::Name.contains(q)),
                        "url" => any = any.add(genre::Column::Url.contains(q)),
                        _ => {},
                    }
                }
                select = select.filter(any);
            }
            select.all(db).await?.iter().map(|m| (m.id, genre_values(m))).collect()
        },
        ModelKind::Actor => {
            let mut select = actor::Entity::find().order_by_asc(actor::Column::Id);
            if let Some((q, fields)) = search {
                if fields.contains(&"name") {
                    select = select.filter(actor::Column::Name.contains(q));
                }
            }
            select.all(db).await?.iter().map(|m| (m.id, actor_values(m))).collect()
        },
        ModelKind::Movie => {
            let mut select = movie::Entity::find().order_by_asc(movie::Column::Id);
            if let Some((q, fields)) = search {
                let mut any = Condition::any();
                let mut join_category = false;
                for name in fields {
                    match *name {
                        "title" => any = any.add(movie::Column::Title.contains(q)),
                        "url" => any = any.add(movie::Column::Url.contains(q)),
                        "category__name" => {
                            join_category = true;
                            any = any.add(category::Column::Name.contains(q));
                        },
                        _ => {},
                    }
                }
                if join_category {
                    select = select.left_join(category::Entity);
                }
                select = select.filter(any);
            }
            if let Some(category_id) = query.filter_id("category") {
                select = select.filter(movie::Column::CategoryId.eq(category_id));
            }
            if let Some(year) = query.filter_id("year") {
                select = select.filter(movie::Column::Year.eq(year));
            }
            if let Some(draft) = query.filter("draft") {
                select = select.filter(movie::Column::Draft.eq(draft == "true"));
            }
            select.all(db).await?.iter().map(|m| (m.id, movie_values(m))).collect()
        },
        ModelKind::MovieShots => {
            let mut select = movie_shot::Entity::find().order_by_asc(movie_shot::Column::Id);
            if let Some(movie_id) = query.filter_id("movie") {
                select = select.filter(movie_shot::Column::MovieId.eq(movie_id));
            }
            if let Some((q, fields)) = search {
                if fields.contains(&"title") {
                    select = select.filter(movie_shot::Column::Title.contains(q));
                }
            }
            select.all(db).await?.iter().map(|m| (m.id, movie_shot_values(m))).collect()
        },
        ModelKind::RatingStar => rating_star::Entity::find()
            .order_by_asc(rating_star::Column::Id)
            .all(db)
            .await?
            .iter()
            .map(|m| (m.id, rating_star_values(m)))
            .collect(),
        ModelKind::Rating => {
            let mut select = rating::Entity::find().order_by_asc(rating::Column::Id);
            if let Some(movie_id) = query.filter_id("movie") {
                select = select.filter(rating::Column::MovieId.eq(movie_id));
            }
            if let Some((q, fields)) = search {
                if fields.contains(&"ip") {
                    select = select.filter(rating::Column::Ip.contains(q));
                }
            }
            select.all(db).await?.iter().map(|m| (m.id, rating_values(m))).collect()
        },
        ModelKind::Reviews => {
            let mut select = review::Entity::find().order_by_asc(review::Column::Id);
            if let Some(movie_id) = query.filter_id("movie") {
                select = select.filter(review::Column::MovieId.eq(movie_id));
            }
            if let Some((q, fields)) = search {
                let mut any = Condition::any();
                for name in fields {
                    match *name {
                        "name" => any = any.add(review::Column::Name.contains(q)),
                        "email" => any = any.add(review::Column::Email.contains(q)),
                        "text" => any = any.add(review::Column::Text.contains(q)),
                        _ => {},
                    }
                }
                select = select.filter(any);
            }
            select.all(db).await?.iter().map(|m| (m.id, review_values(m))).collect()
        },
    };
    Ok(records)
}

fn pairs(values: &[(&str, String)]) -> FormData {
    FormData::new(values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
}

fn opt_id(id: Option<i32>) -> String {
    id.map(|v| v.to_string()).unwrap_or_default()
}

fn category_values(m: &category::Model) -> FormData {
    pairs(&[
        ("name", m.name.clone()),
        ("description", m.description.clone().unwrap_or_default()),
        ("url", m.url.clone()),
    ])
}

fn genre_values(m: &genre::Model) -> FormData {
    pairs(&[("name", m.name.clone()), ("description", m.description.clone()), ("url", m.url.clone())])
}

fn actor_values(m: &actor::Model) -> FormData {
    pairs(&[
        ("name", m.name.clone()),
        ("age", m.age.to_string()),
        ("description", m.description.clone()),
        ("image", m.image.clone()),
    ])
}

fn movie_values(m: &movie::Model) -> FormData {
    pairs(&[
        ("title", m.title.clone()),
        ("tagline", m.tagline.clone()),
        ("description", m.description.clone()),
        ("poster", m.poster.clone()),
        ("year", m.year.to_string()),
        ("country", m.country.clone()),
        ("world_premiere", m.world_premiere.clone().unwrap_or_default()),
        ("budget", m.budget.to_string()),
        ("fees_in_usa", m.fees_in_usa.to_string()),
        ("fees_in_world", m.fees_in_world.to_string()),
        ("category", opt_id(m.category_id)),
        ("url", m.url.clone()),
        ("draft", m.draft.to_string()),
    ])
}

fn movie_shot_values(m: &movie_shot::Model) -> FormData {
    pairs(&[
        ("title", m.title.clone()),
        ("description", m.description.clone()),
        ("image", m.image.clone()),
        ("movie", m.movie_id.to_string()),
    ])
}

fn rating_star_values(m: &rating_star::Model) -> FormData {
    pairs(&[("value", m.value.to_string())])
}

fn rating_values(m: &rating::Model) -> FormData {
    pairs(&[
        ("ip", m.ip.clone()),
        ("star", m.star_id.to_string()),
        ("movie", m.movie_id.to_string()),
    ])
}

fn review_values(m: &review::Model) -> FormData {
    pairs(&[
        ("email", m.email.clone()),
        ("name", m.name.clone()),
        ("text", m.text.clone()),
        ("parent", opt_id(m.parent_id)),
        ("movie", m.movie_id.to_string()),
    ])
}

/// Current values of one record, or `None` if it does not exist.
pub async fn load(db: &DatabaseConnection, kind: ModelKind, id: i32) -> AppResult<Option<FormData>> {
    let values = match kind {
        ModelKind::Category => category::Entity::find_by_id(id).one(db).await?.map(|m| category_values(&m)),
        ModelKind::Genre => genre::Entity::find_by_id(id).one(db).await?.map(|m| genre_values(&m)),
        ModelKind::Actor => actor::Entity::find_by_id(id).one(db).await?.map(|m| actor_values(&m)),
        ModelKind::Movie => match movie::Entity::find_by_id(id).one(db).await? {
            Some(m) => {
                let mut values = movie_values(&m);
                let links = MovieLinks::load(db, id).await?;
                values.set_many("actors", links.actors.iter().map(i32::to_string));
                values.set_many("directors", links.directors.iter().map(i32::to_string));
                values.set_many("genres", links.genres.iter().map(i32::to_string));
                Some(values)
            },
            None => None,
        },
        ModelKind::MovieShots => {
            movie_shot::Entity::find_by_id(id).one(db).await?.map(|m| movie_shot_values(&m))
        },
        ModelKind::RatingStar => {
            rating_star::Entity::find_by_id(id).one(db).await?.map(|m| rating_star_values(&m))
        },
        ModelKind::Rating => rating::Entity::find_by_id(id).one(db).await?.map(|m| rating_values(&m)),
        ModelKind::Reviews => review::Entity::find_by_id(id).one(db).await?.map(|m| review_values(&m)),
    };
    Ok(values)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct MovieLinks {
    actors: Vec<i32>,
    directors: Vec<i32>,
    genres: Vec<i32>,
}

impl MovieLinks {
    async fn load(db: &impl ConnectionTrait, movie_id: i32) -> Result<Self, DbErr> {
        let actors = movie_actor::Entity::find()
            .select_only()
            .column(movie_actor::Column::ActorId)
            .filter(movie_actor::Column::MovieId.eq(movie_id))
            .into_tuple::<i32>()
            .all(db)
            .await?;
        let directors = movie_director::Entity::find()
            .select_only()
            .column(movie_director::Column::ActorId)
            .filter(movie_director::Column::MovieId.eq(movie_id))
            .into_tuple::<i32>()
            .all(db)
            .await?;
        let genres = movie_genre::Entity::find()
            .select_only()
            .column(movie_genre::Column::GenreId)
            .filter(movie_genre::Column::MovieId.eq(movie_id))
            .into_tuple::<i32>()
            .all(db)
            .await?;
        Ok(Self { actors, directors, genres })
    }

    /// Rewrites every link row of the movie.
    async fn replace(&self, db: &impl ConnectionTrait, movie_id: i32) -> Result<(), DbErr> {
        movie_actor::Entity::delete_many()
            .filter(movie_actor::Column::MovieId.eq(movie_id))
            .exec(db)
            .await?;
        movie_director::Entity::delete_many()
            .filter(movie_director::Column::MovieId.eq(movie_id))
            .exec(db)
            .await?;
        movie_genre::Entity::delete_many()
            .filter(movie_genre::Column::MovieId.eq(movie_id))
            .exec(db)
            .await?;

        for actor_id in &self.actors {
            movie_actor::ActiveModel { movie_id: Set(movie_id), actor_id: Set(*actor_id) }
                .insert(db)
                .await?;
        }
        for actor_id in &self.directors {
            movie_director::ActiveModel { movie_id: Set(movie_id), actor_id: Set(*actor_id) }
                .insert(db)
                .await?;
        }
        for genre_id in &self.genres {
            movie_genre::ActiveModel { movie_id: Set(movie_id), genre_id: Set(*genre_id) }
                .insert(db)
                .await?;
        }
        Ok(())
    }
}

/// Turns submitted strings into typed values, collecting one error list per field.
struct Cleaner<'a> {
    kind: ModelKind,
    form: &'a FormData,
    errors: FieldErrors,
}

impl<'a> Cleaner<'a> {
    fn new(kind: ModelKind, form: &'a FormData) -> Self {
        Self { kind, form, errors: FieldErrors::new() }
    }

    fn raw(&self, name: &str) -> &'a str {
        self.form.get(name).map(str::trim).unwrap_or("")
    }

    fn required(&self, name: &str) -> bool {
        field(self.kind, name).is_none_or(|f| f.required)
    }

    fn text(&mut self, name: &str) -> String {
        let value = self.raw(name);
        let max = match field(self.kind, name).map(|f| f.input) {
            Some(Input::Text { max }) | Some(Input::Slug { max }) => Some(max),
            Some(Input::TextArea { max }) => max,
            _ => None,
        };
        if value.is_empty() && self.required(name) {
            self.errors.add(name, "This field is required.");
        } else if let Some(max) = max {
            let len = value.chars().count();
            if len > max {
                self.errors
                    .add(name, format!("Ensure this value has at most {max} characters (it has {len})."));
            }
        }
        value.to_string()
    }

    fn optional_text(&mut self, name: &str) -> Option<String> {
        let value = self.text(name);
        if value.is_empty() { None } else { Some(value) }
    }

    fn slug(&mut self, name: &str) -> String {
        let value = self.text(name);
        if !value.is_empty() && !is_slug(&value) {
            self.errors
                .add(name, "Enter a valid slug of letters, numbers, underscores or hyphens.");
        }
        value
    }

    fn email(&mut self, name: &str) -> String {
        let value = self.text(name);
        if !value.is_empty() && !value.validate_email() {
            self.errors.add(name, "Enter a valid email address.");
        }
        value
    }

    fn number(&mut self, name: &str) -> i32 {
        let default = match field(self.kind, name).map(|f| f.input) {
            Some(Input::Number { default }) => default,
            _ => 0,
        };
        match self.raw(name) {
            "" => default,
            raw => match raw.parse::<i32>() {
                Ok(v) if v >= 0 => v,
                _ => {
                    self.errors.add(name, "Enter a whole number of zero or more.");
                    default
                },
            },
        }
    }

    fn big_number(&mut self, name: &str) -> i64 {
        match self.raw(name) {
            "" => 0,
            raw => match raw.parse::<i64>() {
                Ok(v) if v >= 0 => v,
                _ => {
                    self.errors.add(name, "Enter a whole number of zero or more.");
                    0
                },
            },
        }
    }

    fn checkbox(&self, name: &str) -> bool {
        matches!(self.raw(name), "true" | "on" | "1")
    }

    fn date(&mut self, name: &str) -> Option<String> {
        match self.raw(name) {
            "" => {
                if self.required(name) {
                    self.errors.add(name, "This field is required.");
                }
                None
            },
            raw => match raw.parse::<jiff::civil::Date>() {
                Ok(date) => Some(date.to_string()),
                Err(_) => {
                    self.errors.add(name, "Enter a valid date (YYYY-MM-DD).");
                    None
                },
            },
        }
    }

    fn reference(&mut self, name: &str) -> Option<i32> {
        match self.raw(name) {
            "" => {
                if self.required(name) {
                    self.errors.add(name, "This field is required.");
                }
                None
            },
            raw => match raw.parse::<i32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    self.errors.add(name, "Select a valid choice.");
                    None
                },
            },
        }
    }

    fn required_reference(&mut self, name: &str) -> i32 {
        self.reference(name).unwrap_or_default()
    }

    fn references(&mut self, name: &str) -> Vec<i32> {
        let mut ids = Vec::new();
        for raw in self.form.values(name) {
            match raw.trim().parse::<i32>() {
                Ok(id) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {},
                Err(_) => self.errors.add(name, "Select a valid choice."),
            }
        }
        ids
    }

    fn finish(self) -> Result<(), FieldErrors> {
        self.errors.into_result(())
    }
}

fn is_slug(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn slug_taken<E>(
    db: &impl ConnectionTrait,
    url: E::Column,
    pk: E::Column,
    slug: &str,
    id: Option<i32>,
) -> Result<bool, DbErr>
where
    E: EntityTrait,
{
    let mut select = E::find().filter(url.eq(slug));
    if let Some(id) = id {
        select = select.filter(pk.ne(id));
    }
    Ok(select.one(db).await?.is_some())
}

const SLUG_TAKEN: &str = "A record with this url already exists.";

/// Validates and stores a record. `id` selects update over insert. Returns the
/// saved id, or the field errors when nothing was written.
pub async fn save(
    db: &DatabaseConnection,
    kind: ModelKind,
    id: Option<i32>,
    form: &FormData,
) -> AppResult<Result<i32, FieldErrors>> {
    let mut c = Cleaner::new(kind, form);

    let saved = match kind {
        ModelKind::Category => {
            let name = c.text("name");
            let description = c.optional_text("description");
            let url = c.slug("url");
            if slug_taken::<category::Entity>(db, category::Column::Url, category::Column::Id, &url, id)
                .await?
            {
                c.errors.add("url", SLUG_TAKEN);
            }
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }
            let mut active = category::ActiveModel {
                name: Set(name),
                description: Set(description),
                url: Set(url),
                ..Default::default()
            };
            match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(db).await?.id
                },
                None => active.insert(db).await?.id,
            }
        },
        ModelKind::Genre => {
            let name = c.text("name");
            let description = c.text("description");
            let url = c.slug("url");
            if slug_taken::<genre::Entity>(db, genre::Column::Url, genre::Column::Id, &url, id).await? {
                c.errors.add("url", SLUG_TAKEN);
            }
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }
            let mut active = genre::ActiveModel {
                name: Set(name),
                description: Set(description),
                url: Set(url),
                ..Default::default()
            };
            match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(db).await?.id
                },
                None => active.insert(db).await?.id,
            }
        },
        ModelKind::Actor => {
            let name = c.text("name");
            let age = c.number("age");
            let description = c.text("description");
            let image = c.text("image");
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }
            let mut active = actor::ActiveModel {
                name: Set(name),
                age: Set(age),
                description: Set(description),
                image: Set(image),
                ..Default::default()
            };
            match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(db).await?.id
                },
                None => active.insert(db).await?.id,
            }
        },
        ModelKind::Movie => {
            let title = c.text("title");
            let tagline = c.text("tagline");
            let description = c.text("description");
            let poster = c.text("poster");
            let year = c.number("year");
            let country = c.text("country");
            let world_premiere = c.date("world_premiere");
            let budget = c.big_number("budget");
            let fees_in_usa = c.big_number("fees_in_usa");
            let fees_in_world = c.big_number("fees_in_world");
            let category_id = c.reference("category");
            let url = c.slug("url");
            let draft = c.checkbox("draft");
            let links = MovieLinks {
                actors: c.references("actors"),
                directors: c.references("directors"),
                genres: c.references("genres"),
            };
            if slug_taken::<movie::Entity>(db, movie::Column::Url, movie::Column::Id, &url, id).await? {
                c.errors.add("url", SLUG_TAKEN);
            }
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }

            let mut active = movie::ActiveModel {
                title: Set(title),
                tagline: Set(tagline),
                description: Set(description),
                poster: Set(poster),
                year: Set(year),
                country: Set(country),
                world_premiere: Set(world_premiere),
                budget: Set(budget),
                fees_in_usa: Set(fees_in_usa),
                fees_in_world: Set(fees_in_world),
                category_id: Set(category_id),
                url: Set(url),
                draft: Set(draft),
                ..Default::default()
            };

            let txn = db.begin().await?;
            let saved = match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(&txn).await?
                },
                None => active.insert(&txn).await?,
            };
            links.replace(&txn, saved.id).await?;
            txn.commit().await?;
            saved.id
        },
        ModelKind::MovieShots => {
            let title = c.text("title");
            let description = c.text("description");
            let image = c.text("image");
            let movie_id = c.required_reference("movie");
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }
            let mut active = movie_shot::ActiveModel {
                title: Set(title),
                description: Set(description),
                image: Set(image),
                movie_id: Set(movie_id),
                ..Default::default()
            };
            match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(db).await?.id
                },
                None => active.insert(db).await?.id,
            }
        },
        ModelKind::RatingStar => {
            let value = c.number("value");
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }
            let mut active = rating_star::ActiveModel { value: Set(value), ..Default::default() };
            match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(db).await?.id
                },
                None => active.insert(db).await?.id,
            }
        },
        ModelKind::Rating => {
            let ip = c.text("ip");
            let star_id = c.required_reference("star");
            let movie_id = c.required_reference("movie");
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }
            let mut active = rating::ActiveModel {
                ip: Set(ip),
                star_id: Set(star_id),
                movie_id: Set(movie_id),
                ..Default::default()
            };
            match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(db).await?.id
                },
                None => active.insert(db).await?.id,
            }
        },
        ModelKind::Reviews => {
            let email = c.email("email");
            let name = c.text("name");
            let text = c.text("text");
            let parent_id = c.reference("parent");
            let movie_id = c.required_reference("movie");
            if parent_id.is_some() && parent_id == id {
                c.errors.add("parent", "A review cannot reply to itself.");
            }
            if let Err(errors) = c.finish() {
                return Ok(Err(errors));
            }
            let mut active = review::ActiveModel {
                email: Set(email),
                name: Set(name),
                text: Set(text),
                parent_id: Set(parent_id),
                movie_id: Set(movie_id),
                ..Default::default()
            };
            match id {
                Some(id) => {
                    active.id = Unchanged(id);
                    active.update(db).await?.id
                },
                None => active.insert(db).await?.id,
            }
        },
    };

    Ok(Ok(saved))
}

/// Deletes one record; related rows follow the schema's foreign-key actions.
pub async fn delete(db: &DatabaseConnection, kind: ModelKind, id: i32) -> AppResult<bool> {
    let result = match kind {
        ModelKind::Category => category::Entity::delete_by_id(id).exec(db).await?,
        ModelKind::Genre => genre::Entity::delete_by_id(id).exec(db).await?,
        ModelKind::Actor => actor::Entity::delete_by_id(id).exec(db).await?,
        ModelKind::Movie => movie::Entity::delete_by_id(id).exec(db).await?,
        ModelKind::MovieShots => movie_shot::Entity::delete_by_id(id).exec(db).await?,
        ModelKind::RatingStar => rating_star::Entity::delete_by_id(id).exec(db).await?,
        ModelKind::Rating => rating::Entity::delete_by_id(id).exec(db).await?,
        ModelKind::Reviews => review::Entity::delete_by_id(id).exec(db).await?,
    };
    Ok(result.rows_affected > 0)
}

/// Flips a movie's draft flag. Returns the new value.
pub async fn toggle_draft(db: &DatabaseConnection, id: i32) -> AppResult<Option<bool>> {
    let Some(found) = movie::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let draft = !found.draft;
    let mut active: movie::ActiveModel = found.into();
    active.draft = Set(draft);
    active.update(db).await?;
    Ok(Some(draft))
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::{admin::AdminSite, catalog::fixtures, config::test_config, db::test_db};

    fn form(pairs: &[(&str, &str)]) -> FormData {
        FormData::new(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn movie_form(url: &str) -> FormData {
        form(&[
            ("title", "Heat"),
            ("tagline", ""),
            ("description", "Crime."),
            ("poster", "movies/heat.jpg"),
            ("year", "1995"),
            ("country", "US"),
            ("world_premiere", "1995-12-15"),
            ("budget", "60000000"),
            ("fees_in_usa", ""),
            ("fees_in_world", "187000000"),
            ("category", ""),
            ("url", url),
        ])
    }

    #[test]
    fn form_data_keeps_readonly_values() {
        let current = form(&[("name", "Jane"), ("email", "jane@x.com"), ("text", "old")]);
        let mut submitted = form(&[("name", "Mallory"), ("text", "new")]);
        submitted.keep_from(&["name", "email"], &current);

        assert_eq!(submitted.get("name"), Some("Jane"));
        assert_eq!(submitted.get("email"), Some("jane@x.com"));
        assert_eq!(submitted.get("text"), Some("new"));
    }

    #[test]
    fn changelist_query_splits_search_and_filters() {
        let query = ChangeListQuery::from_pairs(vec![
            ("q".to_string(), " heat ".to_string()),
            ("year".to_string(), "1995".to_string()),
            ("category".to_string(), "".to_string()),
        ]);
        assert_eq!(query.search.as_deref(), Some("heat"));
        assert_eq!(query.filter_id("year"), Some(1995));
        assert_eq!(query.filter("category"), None);
    }

    #[tokio::test]
    async fn movie_save_writes_links_in_one_go() {
        let db = test_db().await;
        let lead = fixtures::actor(&db, "Lead").await;
        let boss = fixtures::actor(&db, "Boss").await;
        let crime = fixtures::genre(&db, "crime").await;

        let mut values = movie_form("heat");
        values.set_many("actors", [lead.id.to_string(), boss.id.to_string()]);
        values.set_many("directors", [boss.id.to_string()]);
        values.set_many("genres", [crime.id.to_string()]);
        values.set("draft", "true");

        let id = save(&db, ModelKind::Movie, None, &values).await.unwrap().unwrap();
        let saved = movie::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
        assert!(saved.draft);
        assert_eq!(saved.fees_in_usa, 0);
        assert_eq!(saved.world_premiere_date().map(|d| d.year()), Some(1995));

        let loaded = load(&db, ModelKind::Movie, id).await.unwrap().unwrap();
        assert_eq!(loaded.values("actors").len(), 2);
        assert_eq!(loaded.values("directors"), vec![boss.id.to_string()]);

        values.set_many("actors", []);
        save(&db, ModelKind::Movie, Some(id), &values).await.unwrap().unwrap();
        assert_eq!(movie_actor::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(movie_director::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_field_error() {
        let db = test_db().await;
        fixtures::movie(&db, "heat", false).await;

        let errors = save(&db, ModelKind::Movie, None, &movie_form("heat")).await.unwrap().unwrap_err();
        assert!(errors.contains("url"));
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_values_are_reported_per_field() {
        let db = test_db().await;
        let values = form(&[
            ("name", ""),
            ("age", "-3"),
            ("description", "x"),
            ("image", "actors/a.jpg"),
        ]);
        let errors = save(&db, ModelKind::Actor, None, &values).await.unwrap().unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("age"));
        assert!(!errors.contains("image"));

        let mut bad_movie = movie_form("bad slug!");
        bad_movie.set("world_premiere", "15/12/1995");
        let errors = save(&db, ModelKind::Movie, None, &bad_movie).await.unwrap().unwrap_err();
        assert!(errors.contains("url"));
        assert!(errors.contains("world_premiere"));
    }

    #[tokio::test]
    async fn changelist_searches_title_and_category_name() {
        let db = test_db().await;
        let noir = fixtures::category(&db, "noir").await;
        let heat = fixtures::movie(&db, "heat", false).await;
        fixtures::movie(&db, "ronin", false).await;
        let mut active: movie::ActiveModel = heat.clone().into();
        active.category_id = Set(Some(noir.id));
        active.update(&db).await.unwrap();

        let site = AdminSite::from_config(&test_config());
        let admin = site.get(ModelKind::Movie).unwrap();

        let by_category = ChangeListQuery::from_pairs(vec![("q".into(), "Category noir".into())]);
        let list = changelist(&db, admin, &by_category).await.unwrap();
        assert_eq!(list.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![heat.id]);
        assert_eq!(list.rows[0].cells[1], ("category", Cell::Text("Category noir".to_string())));

        let by_title = ChangeListQuery::from_pairs(vec![("q".into(), "ronin".into())]);
        let list = changelist(&db, admin, &by_title).await.unwrap();
        assert_eq!(list.rows.len(), 1);
        assert_eq!(list.rows[0].cells[3], ("draft", Cell::Bool(false)));

        let filtered = ChangeListQuery::from_pairs(vec![("category".into(), noir.id.to_string())]);
        let list = changelist(&db, admin, &filtered).await.unwrap();
        assert_eq!(list.rows.len(), 1);
        assert_eq!(list.filters.len(), 2);
        assert_eq!(list.filters[1].options, vec![("2020".to_string(), "2020".to_string())]);
    }

    #[tokio::test]
    async fn thumbnails_point_at_the_image_field() {
        let db = test_db().await;
        let actor = fixtures::actor(&db, "Lead").await;
        let site = AdminSite::from_config(&test_config());
        let admin = site.get(ModelKind::Actor).unwrap();

        let list = changelist(&db, admin, &ChangeListQuery::default()).await.unwrap();
        assert_eq!(
            list.rows[0].cells[2].1,
            Cell::Image { path: actor.image.clone(), width: 50, height: 60 }
        );
    }

    #[tokio::test]
    async fn toggle_and_delete() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "heat", false).await;

        assert_eq!(toggle_draft(&db, movie.id).await.unwrap(), Some(true));
        assert_eq!(toggle_draft(&db, movie.id).await.unwrap(), Some(false));
        assert_eq!(toggle_draft(&db, 999).await.unwrap(), None);

        assert!(delete(&db, ModelKind::Movie, movie.id).await.unwrap());
        assert!(!delete(&db, ModelKind::Movie, movie.id).await.unwrap());
    }
}
