//! Admin surface: per-model list/search/edit configuration plus the CRUD pages
//! generated from it.
//!
//! Registration is explicit. [`AdminSite::from_config`] builds the catalog's site
//! once at startup and the result lives in `AppState`; nothing is registered
//! through global state.

pub mod records;
pub mod routes;
pub mod views;

use std::{fmt, str::FromStr};

use crate::config::Config;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum ModelKind {
    Category,
    Genre,
    Actor,
    Movie,
    MovieShots,
    RatingStar,
    Rating,
    Reviews,
}

impl ModelKind {
    pub const ALL: [ModelKind; 8] = [
        ModelKind::Category,
        ModelKind::Genre,
        ModelKind::Actor,
        ModelKind::Movie,
        ModelKind::MovieShots,
        ModelKind::RatingStar,
        ModelKind::Rating,
        ModelKind::Reviews,
    ];

    /// Path segment under `/admin`.
    pub fn slug(self) -> &'static str {
        match self {
            ModelKind::Category => "category",
            ModelKind::Genre => "genre",
            ModelKind::Actor => "actor",
            ModelKind::Movie => "movie",
            ModelKind::MovieShots => "movieshots",
            ModelKind::RatingStar => "ratingstar",
            ModelKind::Rating => "rating",
            ModelKind::Reviews => "reviews",
        }
    }

    pub fn verbose_name(self) -> &'static str {
        match self {
            ModelKind::Category => "Category",
            ModelKind::Genre => "Genre",
            ModelKind::Actor => "Actors and directors",
            ModelKind::Movie => "Film",
            ModelKind::MovieShots => "Movie shot",
            ModelKind::RatingStar => "Rating star",
            ModelKind::Rating => "Rating",
            ModelKind::Reviews => "Review",
        }
    }

    pub fn verbose_name_plural(self) -> &'static str {
        match self {
            ModelKind::Category => "Categories",
            ModelKind::Genre => "Genres",
            ModelKind::Actor => "Actors and directors",
            ModelKind::Movie => "Films",
            ModelKind::MovieShots => "Movie shots",
            ModelKind::RatingStar => "Rating stars",
            ModelKind::Rating => "Ratings",
            ModelKind::Reviews => "Reviews",
        }
    }

    pub fn changelist_url(self) -> String {
        format!("/admin/{}", self.slug())
    }

    pub fn add_url(self) -> String {
        format!("/admin/{}/add", self.slug())
    }

    pub fn change_url(self, id: i32) -> String {
        format!("/admin/{}/{id}", self.slug())
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown admin model `{0}`")]
pub struct UnknownModel(String);

impl FromStr for ModelKind {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

/// A titled group of form rows; each row holds one or more fields side by side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fieldset {
    pub name: Option<&'static str>,
    pub collapse: bool,
    pub rows: Vec<Vec<&'static str>>,
}

impl Fieldset {
    pub fn new(name: Option<&'static str>, rows: &[&[&'static str]]) -> Self {
        Self { name, collapse: false, rows: rows.iter().map(|r| r.to_vec()).collect() }
    }

    pub fn collapsed(mut self) -> Self {
        self.collapse = true;
        self
    }
}

/// Related rows shown on a parent's change form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inline {
    pub kind: ModelKind,
    pub extra: usize,
    pub readonly_fields: Vec<&'static str>,
}

impl Inline {
    pub fn tabular(kind: ModelKind) -> Self {
        Self { kind, extra: 1, readonly_fields: Vec::new() }
    }

    pub fn readonly_fields(mut self, fields: &[&'static str]) -> Self {
        self.readonly_fields = fields.to_vec();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAdmin {
    pub kind: ModelKind,
    pub list_display: Vec<&'static str>,
    pub list_display_links: Vec<&'static str>,
    pub list_filter: Vec<&'static str>,
    pub search_fields: Vec<&'static str>,
    pub readonly_fields: Vec<&'static str>,
    pub list_editable: Vec<&'static str>,
    pub inlines: Vec<Inline>,
    pub fieldsets: Vec<Fieldset>,
    pub save_on_top: bool,
    pub save_as: bool,
}

impl ModelAdmin {
    /// Defaults: the record's display string as the only column, one field per row.
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            list_display: vec![records::DISPLAY],
            list_display_links: Vec::new(),
            list_filter: Vec::new(),
            search_fields: Vec::new(),
            readonly_fields: Vec::new(),
            list_editable: Vec::new(),
            inlines: Vec::new(),
            fieldsets: Vec::new(),
            save_on_top: false,
            save_as: false,
        }
    }

    pub fn list_display(mut self, fields: &[&'static str]) -> Self {
        self.list_display = fields.to_vec();
        self
    }

    pub fn list_display_links(mut self, fields: &[&'static str]) -> Self {
        self.list_display_links = fields.to_vec();
        self
    }

    pub fn list_filter(mut self, fields: &[&'static str]) -> Self {
        self.list_filter = fields.to_vec();
        self
    }

    pub fn search_fields(mut self, fields: &[&'static str]) -> Self {
        self.search_fields = fields.to_vec();
        self
    }

    pub fn readonly_fields(mut self, fields: &[&'static str]) -> Self {
        self.readonly_fields = fields.to_vec();
        self
    }

    pub fn list_editable(mut self, fields: &[&'static str]) -> Self {
        self.list_editable = fields.to_vec();
        self
    }

    pub fn inline(mut self, inline: Inline) -> Self {
        self.inlines.push(inline);
        self
    }

    pub fn fieldset(mut self, fieldset: Fieldset) -> Self {
        self.fieldsets.push(fieldset);
        self
    }

    pub fn save_on_top(mut self) -> Self {
        self.save_on_top = true;
        self
    }

    pub fn save_as(mut self) -> Self {
        self.save_as = true;
        self
    }

    /// Columns that link to the change form. Falls back to the first column.
    pub fn link_fields(&self) -> Vec<&'static str> {
        if self.list_display_links.is_empty() {
            self.list_display.iter().take(1).copied().collect()
        } else {
            self.list_display_links.clone()
        }
    }

    pub fn is_readonly(&self, field: &str) -> bool {
        self.readonly_fields.contains(&field)
    }

    pub fn is_editable_in_list(&self, field: &str) -> bool {
        self.list_editable.contains(&field)
    }

    /// Declared fieldsets, or every form field followed by computed read-only ones.
    pub fn effective_fieldsets(&self) -> Vec<Fieldset> {
        if !self.fieldsets.is_empty() {
            return self.fieldsets.clone();
        }
        let mut rows: Vec<Vec<&'static str>> = records::fields(self.kind)
            .iter()
            .filter(|f| !f.is_computed())
            .map(|f| vec![f.name])
            .collect();
        rows.extend(
            self.readonly_fields
                .iter()
                .filter(|name| records::field(self.kind, name).is_some_and(|f| f.is_computed()))
                .map(|name| vec![*name]),
        );
        vec![Fieldset { name: None, collapse: false, rows }]
    }
}

#[derive(Clone, Debug)]
pub struct AdminSite {
    pub site_title: String,
    pub site_header: String,
    pub media_url: String,
    models: Vec<ModelAdmin>,
}

impl AdminSite {
    pub fn new(site_title: impl Into<String>, site_header: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
            site_header: site_header.into(),
            media_url: "/media".to_string(),
            models: Vec::new(),
        }
    }

    pub fn media_url(mut self, media_url: impl Into<String>) -> Self {
        self.media_url = media_url.into();
        self
    }

    /// Adds a model. A second registration for the same kind replaces the first.
    pub fn register(mut self, admin: ModelAdmin) -> Self {
        self.models.retain(|m| m.kind != admin.kind);
        self.models.push(admin);
        self
    }

    pub fn get(&self, kind: ModelKind) -> Option<&ModelAdmin> {
        self.models.iter().find(|m| m.kind == kind)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelAdmin> {
        self.models.iter()
    }

    pub fn media_src(&self, path: &str) -> String {
        format!("{}/{}", self.media_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// The catalog's admin registrations.
    pub fn from_config(config: &Config) -> Self {
        AdminSite::new(config.admin_site_title.clone(), config.admin_site_header.clone())
            .media_url(config.media_url.clone())
            .register(
                ModelAdmin::new(ModelKind::Category)
                    .list_display(&["id", "name", "url"])
                    .list_display_links(&["name"]),
            )
            .register(
                ModelAdmin::new(ModelKind::Movie)
                    .list_display(&["title", "category", "url", "draft"])
                    .list_filter(&["category", "year"])
                    .search_fields(&["title", "category__name"])
                    .inline(Inline::tabular(ModelKind::MovieShots).readonly_fields(&["thumbnail"]))
                    .inline(Inline::tabular(ModelKind::Reviews).readonly_fields(&["name", "email"]))
                    .save_on_top()
                    .save_as()
                    .list_editable(&["draft"])
                    .readonly_fields(&["thumbnail"])
                    .fieldset(Fieldset::new(None, &[&["title", "tagline"]]))
                    .fieldset(Fieldset::new(None, &[&["description"], &["poster", "thumbnail"]]))
                    .fieldset(Fieldset::new(None, &[&["year", "world_premiere", "country"]]))
                    .fieldset(
                        Fieldset::new(
                            Some("Actors"),
                            &[&["actors", "directors", "genres", "category"]],
                        )
                        .collapsed(),
                    )
                    .fieldset(Fieldset::new(None, &[&["budget", "fees_in_usa", "fees_in_world"]]))
                    .fieldset(Fieldset::new(Some("Options"), &[&["url", "draft"]])),
            )
            .register(
                ModelAdmin::new(ModelKind::Reviews)
                    .list_display(&["name", "email", "parent", "movie", "id"])
                    .readonly_fields(&["name", "email"]),
            )
            .register(ModelAdmin::new(ModelKind::Genre).list_display(&["name", "url"]))
            .register(
                ModelAdmin::new(ModelKind::Actor)
                    .list_display(&["name", "age", "thumbnail"])
                    .readonly_fields(&["thumbnail"]),
            )
            .register(ModelAdmin::new(ModelKind::Rating).list_display(&["star", "ip"]))
            .register(
                ModelAdmin::new(ModelKind::MovieShots)
                    .list_display(&["title", "movie", "thumbnail"])
                    .readonly_fields(&["thumbnail"]),
            )
            .register(ModelAdmin::new(ModelKind::RatingStar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn every_model_is_registered() {
        let site = AdminSite::from_config(&test_config());
        for kind in ModelKind::ALL {
            assert!(site.get(kind).is_some(), "{kind} missing");
        }
        assert_eq!(site.models().count(), ModelKind::ALL.len());
    }

    #[test]
    fn registering_twice_replaces() {
        let site = AdminSite::new("t", "h")
            .register(ModelAdmin::new(ModelKind::Genre))
            .register(ModelAdmin::new(ModelKind::Genre).list_display(&["name"]));
        assert_eq!(site.models().count(), 1);
        assert_eq!(site.get(ModelKind::Genre).unwrap().list_display, vec!["name"]);
    }

    #[test]
    fn slugs_round_trip() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.slug().parse::<ModelKind>().unwrap(), kind);
        }
        assert!("users".parse::<ModelKind>().is_err());
    }

    #[test]
    fn link_fields_default_to_first_column() {
        let site = AdminSite::from_config(&test_config());
        assert_eq!(site.get(ModelKind::Category).unwrap().link_fields(), vec!["name"]);
        assert_eq!(site.get(ModelKind::Genre).unwrap().link_fields(), vec!["name"]);
    }

    #[test]
    fn default_fieldsets_append_computed_readonly_fields() {
        let site = AdminSite::from_config(&test_config());
        let actor = site.get(ModelKind::Actor).unwrap();
        let rows = &actor.effective_fieldsets()[0].rows;
        assert_eq!(rows.first().unwrap(), &vec!["name"]);
        assert_eq!(rows.last().unwrap(), &vec!["thumbnail"]);

        let movie = site.get(ModelKind::Movie).unwrap();
        let sets = movie.effective_fieldsets();
        assert_eq!(sets.len(), 6);
        assert!(sets[3].collapse);
        assert_eq!(sets[5].name, Some("Options"));
    }

    #[test]
    fn reviews_keep_identity_fields_readonly() {
        let site = AdminSite::from_config(&test_config());
        let reviews = site.get(ModelKind::Reviews).unwrap();
        assert!(reviews.is_readonly("name"));
        assert!(reviews.is_readonly("email"));
        assert!(!reviews.is_readonly("text"));
    }
}
