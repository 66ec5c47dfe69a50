use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::entities::{actor, category, genre, movie, movie_shot, rating_star, review};

/// Field name -> messages, in field order for stable rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errs: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errors) in errs.field_errors() {
            for err in errors {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// Raw review form body. Every field defaults so that missing inputs become field
/// errors instead of extractor rejections.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewSubmission {
    pub name: String,
    pub email: String,
    pub text: String,
    pub parent: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Validate)]
pub struct ReviewForm {
    #[validate(length(min = 1, max = 100, message = "Enter a name of at most 100 characters."))]
    pub name: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email is too long.")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 5000, message = "Enter a message of at most 5000 characters."))]
    pub text: String,
    pub parent_id: Option<i32>,
}

impl ReviewSubmission {
    /// Trims, parses and validates the submission.
    pub fn clean(&self) -> Result<ReviewForm, FieldErrors> {
        let mut errors = FieldErrors::new();

        let parent_id = match self.parent.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("parent", "Reply target must be a review id.");
                    None
                },
            },
        };

        let form = ReviewForm {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            text: self.text.trim().to_string(),
            parent_id,
        };

        if let Err(e) = form.validate() {
            errors.merge(e.into());
        }

        errors.into_result(form)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RatingSubmission {
    pub star: String,
}

impl RatingSubmission {
    pub fn star_id(&self) -> Option<i32> {
        self.star.trim().parse().ok()
    }
}

/// Review form state carried into the detail page when a submission is rejected.
#[derive(Clone, Debug, Default)]
pub struct ReviewFormState {
    pub values: ReviewSubmission,
    pub errors: FieldErrors,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewThread {
    pub review: review::Model,
    pub replies: Vec<ReviewThread>,
}

impl ReviewThread {
    /// Builds threads below `roots` from a flat set of descendants.
    pub fn build(roots: Vec<review::Model>, descendants: Vec<review::Model>) -> Vec<ReviewThread> {
        let mut children: HashMap<i32, Vec<review::Model>> = HashMap::new();
        for reply in descendants {
            if let Some(parent) = reply.parent_id {
                children.entry(parent).or_default().push(reply);
            }
        }
        for list in children.values_mut() {
            list.sort_by_key(|r| r.id);
        }

        roots.into_iter().map(|root| Self::attach(root, &mut children)).collect()
    }

    fn attach(review: review::Model, children: &mut HashMap<i32, Vec<review::Model>>) -> Self {
        let replies = children
            .remove(&review.id)
            .unwrap_or_default()
            .into_iter()
            .map(|reply| Self::attach(reply, children))
            .collect();
        Self { review, replies }
    }

    pub fn count(&self) -> usize {
        1 + self.replies.iter().map(ReviewThread::count).sum::<usize>()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RatingSummary {
    pub votes: usize,
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_values(values: &[i32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let total: i64 = values.iter().map(|v| i64::from(*v)).sum();
        Self { votes: values.len(), average: Some(total as f64 / values.len() as f64) }
    }
}

#[derive(Clone, Debug)]
pub struct MovieDetail {
    pub movie: movie::Model,
    pub category: Option<category::Model>,
    pub genres: Vec<genre::Model>,
    pub actors: Vec<actor::Model>,
    pub directors: Vec<actor::Model>,
    pub shots: Vec<movie_shot::Model>,
    pub stars: Vec<rating_star::Model>,
    pub rating: RatingSummary,
    pub reviews: Vec<ReviewThread>,
}
