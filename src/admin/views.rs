use std::collections::HashMap;

use maud::{Markup, html};

use super::{
    AdminSite, Fieldset, Inline, ModelAdmin, ModelKind,
    records::{self, ChangeList, ChangeListQuery, Cell, Field, FormData, Input, Row},
};
use crate::{models::FieldErrors, templates::page};

const INPUT: &str = "mt-1 w-full rounded-md border border-gray-300 px-3 py-2 text-sm focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";
const BUTTON: &str = "rounded-md bg-blue-600 px-4 py-2 text-sm font-semibold text-white hover:bg-blue-700";
const SECONDARY: &str = "rounded-md border border-gray-300 bg-white px-4 py-2 text-sm text-gray-700 hover:bg-gray-50";

/// Everything the change form needs besides the model configuration.
pub struct FormContext<'a> {
    pub id: Option<i32>,
    pub values: &'a FormData,
    pub errors: &'a FieldErrors,
    pub choices: &'a HashMap<ModelKind, Vec<(i32, String)>>,
    pub inlines: &'a [InlineRows],
}

pub struct InlineRows {
    pub inline: Inline,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Row>,
}

pub fn index_page(site: &AdminSite) -> String {
    admin_page(
        site,
        &site.site_title,
        html! {
            h1 class="text-2xl font-bold text-gray-900" { "Site administration" }
            div class="mt-6 bg-white shadow rounded-lg divide-y" {
                @for admin in site.models() {
                    div class="flex items-center justify-between px-6 py-3" {
                        a class="font-medium text-blue-600 hover:text-blue-800" href=(admin.kind.changelist_url()) {
                            (admin.kind.verbose_name_plural())
                        }
                        a class="text-sm text-gray-500 hover:text-gray-700" href=(admin.kind.add_url()) { "Add" }
                    }
                }
            }
        },
    )
}

pub fn changelist_page(
    site: &AdminSite,
    admin: &ModelAdmin,
    list: &ChangeList,
    query: &ChangeListQuery,
) -> String {
    let kind = admin.kind;
    let links = admin.link_fields();

    admin_page(
        site,
        kind.verbose_name_plural(),
        html! {
            div class="flex items-center justify-between" {
                h1 class="text-2xl font-bold text-gray-900" { "Select " (kind.verbose_name().to_lowercase()) " to change" }
                a class=(BUTTON) href=(kind.add_url()) { "Add " (kind.verbose_name().to_lowercase()) }
            }

            @if !admin.search_fields.is_empty() {
                form class="mt-6 flex gap-2" method="get" action=(kind.changelist_url()) {
                    input class=(INPUT) type="search" name="q" value=(query.search.as_deref().unwrap_or(""));
                    @for (name, value) in &query.filters {
                        input type="hidden" name=(name) value=(value);
                    }
                    button class=(SECONDARY) type="submit" { "Search" }
                }
            }

            div class="mt-6 flex gap-6" {
                div class="flex-1 bg-white shadow rounded-lg overflow-x-auto" {
                    table class="min-w-full text-sm" {
                        thead class="bg-gray-50" {
                            tr {
                                @for name in &admin.list_display {
                                    th class="px-4 py-2 text-left font-semibold text-gray-700" { (records::label(kind, name)) }
                                }
                            }
                        }
                        tbody class="divide-y" {
                            @for row in &list.rows {
                                tr {
                                    @for (name, cell) in &row.cells {
                                        td class="px-4 py-2 text-gray-700" {
                                            @if kind == ModelKind::Movie && admin.is_editable_in_list(name) {
                                                (draft_toggle(row.id, cell))
                                            } @else if links.contains(name) {
                                                a class="text-blue-600 hover:text-blue-800" href=(kind.change_url(row.id)) {
                                                    (cell_markup(site, cell, true))
                                                }
                                            } @else {
                                                (cell_markup(site, cell, false))
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    p class="px-4 py-2 text-xs text-gray-500" { (list.rows.len()) " " (kind.verbose_name_plural().to_lowercase()) }
                }

                @if !list.filters.is_empty() {
                    aside class="w-56 bg-white shadow rounded-lg p-4 text-sm" {
                        h2 class="font-semibold text-gray-900" { "Filter" }
                        @for filter in &list.filters {
                            h3 class="mt-4 text-gray-700" { "By " (filter.label.to_lowercase()) }
                            ul class="mt-1 space-y-1" {
                                li {
                                    a class=(filter_class(filter.selected.is_none())) href=(filter_href(kind, query, filter.field, None)) { "All" }
                                }
                                @for (value, label) in &filter.options {
                                    li {
                                        a class=(filter_class(filter.selected.as_deref() == Some(value.as_str())))
                                            href=(filter_href(kind, query, filter.field, Some(value.as_str()))) { (label) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn change_form_page(site: &AdminSite, admin: &ModelAdmin, ctx: &FormContext<'_>) -> String {
    let kind = admin.kind;
    let action = match ctx.id {
        Some(id) => kind.change_url(id),
        None => kind.add_url(),
    };
    let heading = match ctx.id {
        Some(_) => format!("Change {}", kind.verbose_name().to_lowercase()),
        None => format!("Add {}", kind.verbose_name().to_lowercase()),
    };

    admin_page(
        site,
        &heading,
        html! {
            h1 class="text-2xl font-bold text-gray-900" { (heading) }

            @if !ctx.errors.is_empty() {
                p class="mt-4 rounded-md bg-red-50 px-4 py-2 text-sm text-red-700" { "Please correct the errors below." }
            }

            form class="mt-6 space-y-6" method="post" action=(action) {
                @if admin.save_on_top {
                    (save_buttons(admin, ctx.id))
                }

                @for fieldset in admin.effective_fieldsets() {
                    (fieldset_markup(site, admin, &fieldset, ctx))
                }

                (save_buttons(admin, ctx.id))
            }

            @if let Some(id) = ctx.id {
                form class="mt-4" method="post" action=(format!("{}/delete", kind.change_url(id))) {
                    button class="rounded-md bg-red-600 px-4 py-2 text-sm font-semibold text-white hover:bg-red-700" type="submit" { "Delete" }
                }

                @for inline in ctx.inlines {
                    (inline_markup(site, id, inline))
                }
            }
        },
    )
}

fn fieldset_markup(
    site: &AdminSite,
    admin: &ModelAdmin,
    fieldset: &Fieldset,
    ctx: &FormContext<'_>,
) -> Markup {
    let rows = html! {
        @for row in &fieldset.rows {
            div class="grid gap-4 md:grid-flow-col md:auto-cols-fr" {
                @for name in row {
                    @if let Some(field) = records::field(admin.kind, name) {
                        (field_markup(site, admin, field, ctx))
                    }
                }
            }
        }
    };

    html! {
        div class="bg-white shadow rounded-lg p-6" {
            @if fieldset.collapse {
                details {
                    summary class="cursor-pointer font-semibold text-gray-900" { (fieldset.name.unwrap_or("Show")) }
                    div class="mt-4 space-y-4" { (rows) }
                }
            } @else {
                @if let Some(name) = fieldset.name {
                    h2 class="mb-4 font-semibold text-gray-900" { (name) }
                }
                div class="space-y-4" { (rows) }
            }
        }
    }
}

fn field_markup(site: &AdminSite, admin: &ModelAdmin, field: &Field, ctx: &FormContext<'_>) -> Markup {
    let name = field.name;
    let value = ctx.values.get(name).unwrap_or("");
    let readonly = field.is_computed() || (ctx.id.is_some() && admin.is_readonly(name));

    html! {
        div {
            label class="block text-sm font-medium text-gray-700" for=(name) {
                (field.label)
                @if field.required && !readonly { span class="text-red-600" { " *" } }
            }
            @if readonly {
                div class="mt-1 text-sm text-gray-700" { (readonly_markup(site, field, ctx.values)) }
            } @else {
                (input_markup(field, value, ctx))
            }
            @if let Some(help) = field.help {
                p class="mt-1 text-xs text-gray-500" { (help) }
            }
            @for message in ctx.errors.get(name) {
                p class="mt-1 text-xs text-red-600" { (message) }
            }
        }
    }
}

fn readonly_markup(site: &AdminSite, field: &Field, values: &FormData) -> Markup {
    match field.input {
        Input::Thumbnail { source, width, height } => match values.get(source) {
            Some(path) if !path.is_empty() => html! {
                img src=(site.media_src(path)) width=(width) height=(height);
            },
            _ => html! { "-" },
        },
        _ => html! { (values.get(field.name).filter(|v| !v.is_empty()).unwrap_or("-")) },
    }
}

fn input_markup(field: &Field, value: &str, ctx: &FormContext<'_>) -> Markup {
    let name = field.name;
    match field.input {
        Input::Text { max } | Input::Slug { max } => html! {
            input class=(INPUT) type="text" id=(name) name=(name) maxlength=(max) value=(value);
        },
        Input::TextArea { max } => html! {
            textarea class=(INPUT) id=(name) name=(name) rows="5" maxlength=[max] { (value) }
        },
        Input::Email => html! {
            input class=(INPUT) type="email" id=(name) name=(name) value=(value);
        },
        Input::Number { .. } | Input::BigNumber => html! {
            input class=(INPUT) type="number" min="0" id=(name) name=(name) value=(value);
        },
        Input::Checkbox => html! {
            input type="checkbox" id=(name) name=(name) value="true" checked[value == "true"];
        },
        Input::Date => html! {
            input class=(INPUT) type="date" id=(name) name=(name) value=(value);
        },
        Input::Image { upload_to } => html! {
            input class=(INPUT) type="text" id=(name) name=(name) placeholder=(format!("{upload_to}…")) value=(value);
        },
        Input::Select { model } => {
            let options = ctx.choices.get(&model).map(Vec::as_slice).unwrap_or(&[]);
            html! {
                select class=(INPUT) id=(name) name=(name) {
                    option value="" { "---------" }
                    @for (id, label) in options {
                        option value=(id) selected[id.to_string() == value] { (label) }
                    }
                }
            }
        },
        Input::MultiSelect { model } => {
            let options = ctx.choices.get(&model).map(Vec::as_slice).unwrap_or(&[]);
            let selected = ctx.values.values(name);
            html! {
                select class=(INPUT) id=(name) name=(name) multiple size="6" {
                    @for (id, label) in options {
                        option value=(id) selected[selected.contains(&id.to_string().as_str())] { (label) }
                    }
                }
            }
        },
        Input::Thumbnail { .. } => html! {},
    }
}

fn save_buttons(admin: &ModelAdmin, id: Option<i32>) -> Markup {
    html! {
        div class="flex flex-wrap gap-2" {
            button class=(BUTTON) type="submit" name="_save" value="1" { "Save" }
            button class=(SECONDARY) type="submit" name="_continue" value="1" { "Save and continue editing" }
            button class=(SECONDARY) type="submit" name="_addanother" value="1" { "Save and add another" }
            @if admin.save_as && id.is_some() {
                button class=(SECONDARY) type="submit" name="_saveasnew" value="1" { "Save as new" }
            }
        }
    }
}

fn inline_markup(site: &AdminSite, parent_id: i32, inline: &InlineRows) -> Markup {
    let kind = inline.inline.kind;
    html! {
        div class="mt-8 bg-white shadow rounded-lg p-6" {
            h2 class="font-semibold text-gray-900" { (kind.verbose_name_plural()) }
            table class="mt-4 min-w-full text-sm" {
                thead {
                    tr {
                        @for name in &inline.columns {
                            th class="px-2 py-1 text-left text-gray-700" { (records::label(kind, name)) }
                        }
                        th {}
                    }
                }
                tbody class="divide-y" {
                    @for row in &inline.rows {
                        tr {
                            @for (_, cell) in &row.cells {
                                td class="px-2 py-1 text-gray-700" { (cell_markup(site, cell, false)) }
                            }
                            td class="px-2 py-1" {
                                a class="text-blue-600 hover:text-blue-800" href=(kind.change_url(row.id)) { "Change" }
                            }
                        }
                    }
                }
            }
            @for _ in 0..inline.inline.extra {
                a class="mt-4 inline-block text-sm text-blue-600 hover:text-blue-800"
                    href=(format!("{}?movie={parent_id}", kind.add_url())) {
                    "Add another " (kind.verbose_name().to_lowercase())
                }
            }
        }
    }
}

fn cell_markup(site: &AdminSite, cell: &Cell, linked: bool) -> Markup {
    match cell {
        Cell::Text(text) => html! { (text) },
        Cell::Bool(true) => html! { span class="text-green-600" { "yes" } },
        Cell::Bool(false) => html! { span class="text-gray-400" { "no" } },
        Cell::Image { path, width, height } => html! {
            img src=(site.media_src(path)) width=(width) height=(height);
        },
        Cell::Empty if linked => html! { "(none)" },
        Cell::Empty => html! { "-" },
    }
}

fn draft_toggle(id: i32, cell: &Cell) -> Markup {
    let draft = matches!(cell, Cell::Bool(true));
    html! {
        form method="post" action=(format!("{}/draft", ModelKind::Movie.change_url(id))) {
            button class="text-sm" type="submit" title="Toggle draft" {
                input type="checkbox" checked[draft] disabled;
            }
        }
    }
}

fn filter_class(active: bool) -> &'static str {
    if active { "font-semibold text-gray-900" } else { "text-blue-600 hover:text-blue-800" }
}

fn filter_href(kind: ModelKind, query: &ChangeListQuery, field: &str, value: Option<&str>) -> String {
    let mut params: Vec<(String, String)> = Vec::new();
    if let Some(q) = &query.search {
        params.push(("q".to_string(), q.clone()));
    }
    params.extend(query.filters.iter().filter(|(k, _)| k != field).cloned());
    if let Some(value) = value {
        params.push((field.to_string(), value.to_string()));
    }

    let encoded = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    if encoded.is_empty() {
        kind.changelist_url()
    } else {
        format!("{}?{encoded}", kind.changelist_url())
    }
}

fn admin_page(site: &AdminSite, title: &str, content: Markup) -> String {
    page(
        &format!("{title} | {}", site.site_title),
        html! {
            div class="min-h-screen bg-gray-50" {
                header class="bg-gray-900 text-white" {
                    div class="max-w-6xl mx-auto px-6 py-4 flex items-center justify-between" {
                        a class="text-lg font-semibold" href="/admin" { (site.site_header) }
                        a class="text-sm text-gray-300 hover:text-white" href="/" { "View site" }
                    }
                }
                main class="max-w-6xl mx-auto px-6 py-8" { (content) }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_links_replace_only_their_own_field() {
        let query = ChangeListQuery {
            search: Some("heat & co".to_string()),
            filters: vec![("year".to_string(), "1995".to_string())],
        };
        assert_eq!(
            filter_href(ModelKind::Movie, &query, "year", Some("2001")),
            "/admin/movie?q=heat%20%26%20co&year=2001"
        );
        assert_eq!(
            filter_href(ModelKind::Movie, &ChangeListQuery::default(), "year", None),
            "/admin/movie"
        );
    }
}
