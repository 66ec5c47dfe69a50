use maud::{DOCTYPE, Markup, html};

use crate::{
    config::Config,
    entities::{actor, movie},
    models::{MovieDetail, ReviewFormState, ReviewThread},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

pub fn movie_list_page(config: &Config, movies: &[movie::Model]) -> String {
    page(
        "Movies",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-5xl mx-auto px-6 py-12" {
                    h1 class="text-3xl font-bold text-gray-900" { "Movies" }

                    @if movies.is_empty() {
                        div class="mt-10 bg-white shadow rounded-lg p-8" {
                            p class="text-gray-600" { "No movies yet." }
                        }
                    } @else {
                        div class="mt-10 grid gap-6 sm:grid-cols-2 lg:grid-cols-3" {
                            @for movie in movies {
                                (movie_card(config, movie))
                            }
                        }
                    }
                }
            }
        },
    )
}

fn movie_card(config: &Config, movie: &movie::Model) -> Markup {
    html! {
        a class="block bg-white shadow rounded-lg overflow-hidden hover:shadow-md" href=(movie.absolute_url()) {
            img class="w-full h-72 object-cover" src=(config.media_src(&movie.poster)) alt=(movie.title);
            div class="p-4" {
                h2 class="text-lg font-semibold text-gray-900" {
                    (movie.title)
                    span class="ml-2 font-normal text-gray-500" { "(" (movie.year) ")" }
                }
                @if !movie.tagline.is_empty() {
                    p class="mt-1 text-sm text-gray-600" { (movie.tagline) }
                }
            }
        }
    }
}

pub fn movie_detail_page(config: &Config, detail: &MovieDetail, form: &ReviewFormState) -> String {
    let movie = &detail.movie;
    let detail_url = movie.absolute_url();

    page(
        &movie.title,
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-4xl mx-auto px-6 py-12 space-y-8" {
                    a class="text-sm text-blue-600 hover:text-blue-800" href="/" { "All movies" }

                    div class="bg-white shadow rounded-lg p-8 md:flex gap-8" {
                        img class="w-48 rounded" src=(config.media_src(&movie.poster)) alt=(movie.title);
                        div class="mt-6 md:mt-0 flex-1" {
                            h1 class="text-3xl font-bold text-gray-900" { (movie.title) }
                            @if !movie.tagline.is_empty() {
                                p class="mt-1 italic text-gray-600" { (movie.tagline) }
                            }
                            dl class="mt-6 grid grid-cols-2 gap-x-6 gap-y-2 text-sm" {
                                dt class="text-gray-500" { "Year" } dd { (movie.year) }
                                dt class="text-gray-500" { "Country" } dd { (movie.country) }
                                @if let Some(category) = &detail.category {
                                    dt class="text-gray-500" { "Category" } dd { (category.name) }
                                }
                                @if !detail.genres.is_empty() {
                                    dt class="text-gray-500" { "Genres" }
                                    dd { (join(detail.genres.iter().map(|g| g.name.as_str()))) }
                                }
                                @if !detail.directors.is_empty() {
                                    dt class="text-gray-500" { "Directors" } dd { (people(&detail.directors)) }
                                }
                                @if !detail.actors.is_empty() {
                                    dt class="text-gray-500" { "Actors" } dd { (people(&detail.actors)) }
                                }
                                @if let Some(date) = movie.world_premiere_date() {
                                    dt class="text-gray-500" { "World premiere" }
                                    dd { (date.strftime("%e %B %Y").to_string().trim()) }
                                }
                                dt class="text-gray-500" { "Budget" } dd { (dollars(movie.budget)) }
                                dt class="text-gray-500" { "US box office" } dd { (dollars(movie.fees_in_usa)) }
                                dt class="text-gray-500" { "World box office" } dd { (dollars(movie.fees_in_world)) }
                            }
                        }
                    }

                    div class="bg-white shadow rounded-lg p-8" {
                        p class="text-gray-700 whitespace-pre-line" { (movie.description) }
                    }

                    @if !detail.shots.is_empty() {
                        div class="bg-white shadow rounded-lg p-8" {
                            h2 class="text-xl font-semibold text-gray-900" { "Shots" }
                            div class="mt-4 grid gap-4 grid-cols-2 md:grid-cols-3" {
                                @for shot in &detail.shots {
                                    figure {
                                        img class="rounded" src=(config.media_src(&shot.image)) alt=(shot.title);
                                        figcaption class="mt-1 text-xs text-gray-500" { (shot.title) }
                                    }
                                }
                            }
                        }
                    }

                    (rating_block(detail))

                    div class="bg-white shadow rounded-lg p-8" {
                        h2 class="text-xl font-semibold text-gray-900" { "Reviews" }
                        @if detail.reviews.is_empty() {
                            p class="mt-4 text-gray-500" { "No reviews yet." }
                        } @else {
                            div class="mt-4 space-y-4" {
                                @for thread in &detail.reviews {
                                    (review_thread(&detail_url, thread))
                                }
                            }
                        }
                        (review_form(movie.id, form))
                    }
                }
            }
        },
    )
}

fn rating_block(detail: &MovieDetail) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg p-8" {
            h2 class="text-xl font-semibold text-gray-900" { "Rating" }
            p class="mt-2 text-gray-600" {
                @match detail.rating.average {
                    Some(avg) => { (format!("{avg:.1}")) " from " (detail.rating.votes) " votes" },
                    None => "Not rated yet",
                }
            }
            @if !detail.stars.is_empty() {
                form class="mt-4 flex gap-2" method="post" action=(format!("/rating/{}", detail.movie.id)) {
                    @for star in &detail.stars {
                        button class="rounded-md border border-gray-300 px-3 py-1 hover:bg-yellow-50" type="submit" name="star" value=(star.id) {
                            (star.value) " ★"
                        }
                    }
                }
            }
        }
    }
}

/// Reply links carry the full detail path: the same markup is also served from
/// `POST /review/{movie_id}`.
fn review_thread(detail_url: &str, thread: &ReviewThread) -> Markup {
    let review = &thread.review;
    html! {
        div id=(format!("review-{}", review.id)) class="border-l-4 border-blue-500 pl-4" {
            p class="text-sm font-semibold text-gray-900" { (review.name) }
            p class="mt-1 text-gray-700 whitespace-pre-line" { (review.text) }
            a class="text-xs text-blue-600 hover:text-blue-800" href=(format!("{detail_url}?parent={}#review-form", review.id)) { "Reply" }
            @if !thread.replies.is_empty() {
                div class="mt-3 ml-4 space-y-3" {
                    @for reply in &thread.replies {
                        (review_thread(detail_url, reply))
                    }
                }
            }
        }
    }
}

fn review_form(movie_id: i32, form: &ReviewFormState) -> Markup {
    let values = &form.values;
    let field_errors = |name: &str| {
        html! {
            @for message in form.errors.get(name) {
                p class="mt-1 text-xs text-red-600" { (message) }
            }
        }
    };

    html! {
        form id="review-form" class="mt-8 space-y-4" method="post" action=(format!("/review/{movie_id}")) {
            h3 class="font-semibold text-gray-900" { "Leave a review" }
            input type="hidden" name="parent" value=(values.parent.as_deref().unwrap_or(""));
            (field_errors("parent"))
            div {
                label class="block text-sm font-medium text-gray-700" for="name" { "Name" }
                input class="mt-1 w-full rounded-md border border-gray-300 px-3 py-2" name="name" id="name" maxlength="100" value=(values.name) required;
                (field_errors("name"))
            }
            div {
                label class="block text-sm font-medium text-gray-700" for="email" { "Email" }
                input class="mt-1 w-full rounded-md border border-gray-300 px-3 py-2" type="email" name="email" id="email" value=(values.email) required;
                (field_errors("email"))
            }
            div {
                label class="block text-sm font-medium text-gray-700" for="text" { "Message" }
                textarea class="mt-1 w-full rounded-md border border-gray-300 px-3 py-2" name="text" id="text" rows="5" maxlength="5000" required { (values.text) }
                (field_errors("text"))
            }
            button class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { "Send" }
        }
    }
}

fn people(list: &[actor::Model]) -> String {
    join(list.iter().map(|a| a.name.as_str()))
}

fn join<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// `1234567` -> `$1,234,567`.
fn dollars(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 { format!("-${grouped}") } else { format!("${grouped}") }
}

pub fn not_found_page(what: &str) -> String {
    message_page("Not found", &format!("The requested {what} does not exist."))
}

pub fn error_page(message: String) -> String {
    message_page("Error", &message)
}

fn message_page(heading: &str, message: &str) -> String {
    page(
        heading,
        html! {
            div class="min-h-screen bg-gray-50 flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { (heading) }
                        p class="mt-4 text-gray-700" { (message) }
                        a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
                    }
                }
            }
        },
    )
}

pub(crate) fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body { (body) }
        }
    }
    .into_string()
}
