use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    entities::{
        actor, genre, movie, movie_actor, movie_director, movie_genre, movie_shot, rating,
        rating_star, review,
    },
    error::AppResult,
    models::{MovieDetail, RatingSummary, ReviewForm, ReviewThread},
};

/// Read/write access to the public side of the catalog.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn published_movies(&self) -> AppResult<Vec<movie::Model>> {
        let movies = movie::Entity::find()
            .filter(movie::Column::Draft.eq(false))
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?;
        Ok(movies)
    }

    pub async fn movie_by_slug(&self, slug: &str) -> AppResult<Option<movie::Model>> {
        let movie = movie::Entity::find().filter(movie::Column::Url.eq(slug)).one(&self.db).await?;
        Ok(movie)
    }

    pub async fn movie_by_id(&self, id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Everything the detail page shows for one movie.
    pub async fn movie_detail(&self, movie: movie::Model) -> AppResult<MovieDetail> {
        let category = movie.find_related(crate::entities::category::Entity).one(&self.db).await?;

        let genre_ids = movie_genre::Entity::find()
            .select_only()
            .column(movie_genre::Column::GenreId)
            .filter(movie_genre::Column::MovieId.eq(movie.id))
            .into_tuple::<i32>()
            .all(&self.db)
            .await?;
        let genres = genre::Entity::find()
            .filter(genre::Column::Id.is_in(genre_ids))
            .order_by_asc(genre::Column::Name)
            .all(&self.db)
            .await?;

        let actors = self.people(movie.id, Role::Actor).await?;
        let directors = self.people(movie.id, Role::Director).await?;

        let shots = movie
            .find_related(movie_shot::Entity)
            .order_by_asc(movie_shot::Column::Id)
            .all(&self.db)
            .await?;

        let stars = self.rating_stars().await?;
        let rating = self.rating_summary(movie.id).await?;
        let reviews = self.review_threads(movie.id).await?;

        Ok(MovieDetail { movie, category, genres, actors, directors, shots, stars, rating, reviews })
    }

    pub async fn actor_ids(&self, movie_id: i32, role: Role) -> AppResult<Vec<i32>> {
        let ids = match role {
            Role::Actor => {
                movie_actor::Entity::find()
                    .select_only()
                    .column(movie_actor::Column::ActorId)
                    .filter(movie_actor::Column::MovieId.eq(movie_id))
                    .into_tuple::<i32>()
                    .all(&self.db)
                    .await?
            },
            Role::Director => {
                movie_director::Entity::find()
                    .select_only()
                    .column(movie_director::Column::ActorId)
                    .filter(movie_director::Column::MovieId.eq(movie_id))
                    .into_tuple::<i32>()
                    .all(&self.db)
                    .await?
            },
        };
        Ok(ids)
    }

    async fn people(&self, movie_id: i32, role: Role) -> AppResult<Vec<actor::Model>> {
        let ids = self.actor_ids(movie_id, role).await?;
        let people = actor::Entity::find()
            .filter(actor::Column::Id.is_in(ids))
            .order_by_asc(actor::Column::Name)
            .all(&self.db)
            .await?;
        Ok(people)
    }

    /// Reviews without a parent.
    pub async fn top_level_reviews(&self, movie_id: i32) -> AppResult<Vec<review::Model>> {
        let reviews = review::Entity::find()
            .filter(review::Column::MovieId.eq(movie_id))
            .filter(review::Column::ParentId.is_null())
            .order_by_asc(review::Column::Id)
            .all(&self.db)
            .await?;
        Ok(reviews)
    }

    /// Top-level reviews with every reply below them. Replies are followed by parent
    /// id alone, so a reply filed under another movie still shows under its parent.
    pub async fn review_threads(&self, movie_id: i32) -> AppResult<Vec<ReviewThread>> {
        let roots = self.top_level_reviews(movie_id).await?;

        let mut seen: HashSet<i32> = roots.iter().map(|r| r.id).collect();
        let mut frontier: Vec<i32> = seen.iter().copied().collect();
        let mut descendants = Vec::new();

        while !frontier.is_empty() {
            let replies = review::Entity::find()
                .filter(review::Column::ParentId.is_in(frontier))
                .all(&self.db)
                .await?;
            frontier = replies.iter().map(|r| r.id).filter(|id| seen.insert(*id)).collect();
            descendants.extend(replies);
        }

        Ok(ReviewThread::build(roots, descendants))
    }

    /// Stores a validated review. The parent id is taken as given.
    pub async fn add_review(&self, movie_id: i32, form: ReviewForm) -> AppResult<review::Model> {
        let model = review::ActiveModel {
            email: Set(form.email),
            name: Set(form.name),
            text: Set(form.text),
            parent_id: Set(form.parent_id),
            movie_id: Set(movie_id),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn rating_stars(&self) -> AppResult<Vec<rating_star::Model>> {
        let stars = rating_star::Entity::find()
            .order_by_asc(rating_star::Column::Value)
            .all(&self.db)
            .await?;
        Ok(stars)
    }

    pub async fn rating_star(&self, id: i32) -> AppResult<Option<rating_star::Model>> {
        Ok(rating_star::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn rating_summary(&self, movie_id: i32) -> AppResult<RatingSummary> {
        let values = rating::Entity::find()
            .inner_join(rating_star::Entity)
            .select_only()
            .column(rating_star::Column::Value)
            .filter(rating::Column::MovieId.eq(movie_id))
            .into_tuple::<i32>()
            .all(&self.db)
            .await?;
        Ok(RatingSummary::from_values(&values))
    }

    /// Records a star for (ip, movie), replacing an earlier one from the same ip.
    pub async fn rate(&self, movie_id: i32, ip: &str, star_id: i32) -> AppResult<rating::Model> {
        let existing = rating::Entity::find()
            .filter(rating::Column::MovieId.eq(movie_id))
            .filter(rating::Column::Ip.eq(ip))
            .order_by_asc(rating::Column::Id)
            .one(&self.db)
            .await?;

        let saved = match existing {
            Some(found) => {
                let mut active: rating::ActiveModel = found.into();
                active.star_id = Set(star_id);
                active.update(&self.db).await?
            },
            None => {
                rating::ActiveModel {
                    ip: Set(ip.to_string()),
                    star_id: Set(star_id),
                    movie_id: Set(movie_id),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?
            },
        };
        Ok(saved)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Actor,
    Director,
}

#[cfg(test)]
pub mod fixtures {
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use crate::entities::{actor, category, genre, movie, rating_star, review};

    pub async fn category(db: &DatabaseConnection, url: &str) -> category::Model {
        category::ActiveModel {
            name: Set(format!("Category {url}")),
            description: Set(None),
            url: Set(url.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn genre(db: &DatabaseConnection, url: &str) -> genre::Model {
        genre::ActiveModel {
            name: Set(format!("Genre {url}")),
            description: Set(String::new()),
            url: Set(url.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn actor(db: &DatabaseConnection, name: &str) -> actor::Model {
        actor::ActiveModel {
            name: Set(name.to_string()),
            age: Set(40),
            description: Set(String::new()),
            image: Set(format!("actors/{name}.jpg")),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn movie(db: &DatabaseConnection, url: &str, draft: bool) -> movie::Model {
        movie::ActiveModel {
            title: Set(format!("Movie {url}")),
            tagline: Set(String::new()),
            description: Set("A film.".to_string()),
            poster: Set(format!("movies/{url}.jpg")),
            year: Set(2020),
            country: Set("US".to_string()),
            world_premiere: Set(None),
            budget: Set(0),
            fees_in_usa: Set(0),
            fees_in_world: Set(0),
            category_id: Set(None),
            url: Set(url.to_string()),
            draft: Set(draft),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn star(db: &DatabaseConnection, value: i32) -> rating_star::Model {
        rating_star::ActiveModel { value: Set(value), ..Default::default() }
            .insert(db)
            .await
            .unwrap()
    }

    pub async fn review(
        db: &DatabaseConnection,
        movie_id: i32,
        parent_id: Option<i32>,
    ) -> review::Model {
        review::ActiveModel {
            email: Set("viewer@example.com".to_string()),
            name: Set("Viewer".to_string()),
            text: Set("Nice.".to_string()),
            parent_id: Set(parent_id),
            movie_id: Set(movie_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    use super::{fixtures, *};
    use crate::{db::test_db, entities::category};

    #[tokio::test]
    async fn published_movies_skip_drafts() {
        let db = test_db().await;
        let public = fixtures::movie(&db, "public", false).await;
        fixtures::movie(&db, "hidden", true).await;
        let catalog = Catalog::new(db);

        let movies = catalog.published_movies().await.unwrap();
        assert_eq!(movies.iter().map(|m| m.id).collect::<Vec<_>>(), vec![public.id]);
    }

    #[tokio::test]
    async fn slug_lookup_misses_cleanly() {
        let db = test_db().await;
        fixtures::movie(&db, "known", true).await;
        let catalog = Catalog::new(db);

        assert!(catalog.movie_by_slug("known").await.unwrap().is_some());
        assert!(catalog.movie_by_slug("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn detail_collects_people_and_genres() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let lead = fixtures::actor(&db, "Lead").await;
        let boss = fixtures::actor(&db, "Boss").await;
        let drama = fixtures::genre(&db, "drama").await;

        movie_actor::ActiveModel { movie_id: Set(movie.id), actor_id: Set(lead.id) }
            .insert(&db)
            .await
            .unwrap();
        movie_director::ActiveModel { movie_id: Set(movie.id), actor_id: Set(boss.id) }
            .insert(&db)
            .await
            .unwrap();
        movie_genre::ActiveModel { movie_id: Set(movie.id), genre_id: Set(drama.id) }
            .insert(&db)
            .await
            .unwrap();

        let catalog = Catalog::new(db);
        let detail = catalog.movie_detail(movie).await.unwrap();
        assert_eq!(detail.actors, vec![lead]);
        assert_eq!(detail.directors, vec![boss]);
        assert_eq!(detail.genres, vec![drama]);
        assert!(detail.category.is_none());
    }

    #[tokio::test]
    async fn threads_only_start_at_top_level_reviews() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let other = fixtures::movie(&db, "o", false).await;
        let root = fixtures::review(&db, movie.id, None).await;
        let reply = fixtures::review(&db, movie.id, Some(root.id)).await;
        let foreign_reply = fixtures::review(&db, other.id, Some(root.id)).await;
        let catalog = Catalog::new(db);

        let top = catalog.top_level_reviews(movie.id).await.unwrap();
        assert_eq!(top, vec![root.clone()]);

        let threads = catalog.review_threads(movie.id).await.unwrap();
        assert_eq!(threads.len(), 1);
        let ids: Vec<i32> = threads[0].replies.iter().map(|t| t.review.id).collect();
        assert_eq!(ids, vec![reply.id, foreign_reply.id]);

        assert!(catalog.review_threads(other.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rerating_updates_existing_row() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let low = fixtures::star(&db, 1).await;
        let high = fixtures::star(&db, 5).await;
        let catalog = Catalog::new(db);

        catalog.rate(movie.id, "10.0.0.1", low.id).await.unwrap();
        let updated = catalog.rate(movie.id, "10.0.0.1", high.id).await.unwrap();
        catalog.rate(movie.id, "10.0.0.2", low.id).await.unwrap();

        assert_eq!(updated.star_id, high.id);
        assert_eq!(rating::Entity::find().count(catalog.db()).await.unwrap(), 2);

        let summary = catalog.rating_summary(movie.id).await.unwrap();
        assert_eq!(summary.votes, 2);
        assert_eq!(summary.average, Some(3.0));
    }

    #[tokio::test]
    async fn deleting_category_keeps_movies() {
        let db = test_db().await;
        let cat = fixtures::category(&db, "c").await;
        let movie = fixtures::movie(&db, "m", false).await;
        let mut active: movie::ActiveModel = movie.into();
        active.category_id = Set(Some(cat.id));
        let movie = active.update(&db).await.unwrap();

        category::Entity::delete_by_id(cat.id).exec(&db).await.unwrap();

        let reloaded = movie::Entity::find_by_id(movie.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.category_id, None);
    }

    #[tokio::test]
    async fn deleting_movie_cascades_to_children() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let star = fixtures::star(&db, 3).await;
        let actor = fixtures::actor(&db, "A").await;
        fixtures::review(&db, movie.id, None).await;
        movie_shot::ActiveModel {
            title: Set("Shot".to_string()),
            description: Set(String::new()),
            image: Set("movie_shots/s.jpg".to_string()),
            movie_id: Set(movie.id),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        movie_actor::ActiveModel { movie_id: Set(movie.id), actor_id: Set(actor.id) }
            .insert(&db)
            .await
            .unwrap();
        let catalog = Catalog::new(db.clone());
        catalog.rate(movie.id, "1.2.3.4", star.id).await.unwrap();

        movie::Entity::delete_by_id(movie.id).exec(&db).await.unwrap();

        assert_eq!(movie_shot::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(rating::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(movie_actor::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(actor::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_people_genres_and_stars_only_drops_their_rows() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let auteur = fixtures::actor(&db, "Auteur").await;
        let drama = fixtures::genre(&db, "drama").await;
        let star = fixtures::star(&db, 4).await;
        let other_star = fixtures::star(&db, 2).await;

        movie_actor::ActiveModel { movie_id: Set(movie.id), actor_id: Set(auteur.id) }
            .insert(&db)
            .await
            .unwrap();
        movie_director::ActiveModel { movie_id: Set(movie.id), actor_id: Set(auteur.id) }
            .insert(&db)
            .await
            .unwrap();
        movie_genre::ActiveModel { movie_id: Set(movie.id), genre_id: Set(drama.id) }
            .insert(&db)
            .await
            .unwrap();
        let catalog = Catalog::new(db.clone());
        catalog.rate(movie.id, "10.0.0.1", star.id).await.unwrap();
        catalog.rate(movie.id, "10.0.0.2", other_star.id).await.unwrap();

        actor::Entity::delete_by_id(auteur.id).exec(&db).await.unwrap();
        assert_eq!(movie_actor::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(movie_director::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(movie_genre::Entity::find().count(&db).await.unwrap(), 1);

        genre::Entity::delete_by_id(drama.id).exec(&db).await.unwrap();
        assert_eq!(movie_genre::Entity::find().count(&db).await.unwrap(), 0);

        rating_star::Entity::delete_by_id(star.id).exec(&db).await.unwrap();
        let left = rating::Entity::find().all(&db).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].star_id, other_star.id);

        assert!(movie::Entity::find_by_id(movie.id).one(&db).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_parent_review_orphans_replies() {
        let db = test_db().await;
        let movie = fixtures::movie(&db, "m", false).await;
        let root = fixtures::review(&db, movie.id, None).await;
        let reply = fixtures::review(&db, movie.id, Some(root.id)).await;

        review::Entity::delete_by_id(root.id).exec(&db).await.unwrap();

        let reloaded = review::Entity::find_by_id(reply.id).one(&db).await.unwrap().unwrap();
        assert!(reloaded.is_top_level());
    }
}
