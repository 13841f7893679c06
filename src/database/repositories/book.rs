//! SeaORM-based book repository
//!
//! Database-agnostic access to the `books` table. All mutating operations
//! that read before writing run inside a transaction; errors roll back.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, ModelTrait, NotSet, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use std::sync::Arc;

use crate::entities::{books, prelude::Books};
use crate::models::{Book, BookFields, BookPatch, BookSource};

#[derive(Debug, FromQueryResult)]
struct AuthorCountRow {
    author: String,
    book_count: i64,
}

/// SeaORM-based repository for book records
#[derive(Clone)]
pub struct BookRepository {
    connection: Arc<DatabaseConnection>,
}

impl BookRepository {
    /// Create a new repository instance
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Case-insensitive substring search over title, author, publisher and
    /// the textual form of the publish year, ordered by id
    pub async fn search(&self, query: &str) -> Result<Vec<Book>, DbErr> {
        let pattern = format!("%{}%", query.to_lowercase());

        let condition = Condition::any()
            .add(Expr::cust_with_values(
                "LOWER(title) LIKE ?",
                [pattern.clone()],
            ))
            .add(Expr::cust_with_values(
                "LOWER(author) LIKE ?",
                [pattern.clone()],
            ))
            .add(Expr::cust_with_values(
                "LOWER(publisher) LIKE ?",
                [pattern.clone()],
            ))
            .add(Expr::cust_with_values(
                "CAST(first_publish_year AS TEXT) LIKE ?",
                [pattern],
            ));

        let models = Books::find()
            .filter(condition)
            .order_by_asc(books::Column::Id)
            .all(&*self.connection)
            .await?;

        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    /// Case-insensitive substring match on author, grouped with counts
    pub async fn aggregate_authors(&self, query: &str) -> Result<Vec<(String, u64)>, DbErr> {
        let pattern = format!("%{}%", query.to_lowercase());

        let rows = Books::find()
            .select_only()
            .column(books::Column::Author)
            .column_as(books::Column::Id.count(), "book_count")
            .filter(Expr::cust_with_values("LOWER(author) LIKE ?", [pattern]))
            .group_by(books::Column::Author)
            .order_by_asc(books::Column::Author)
            .into_model::<AuthorCountRow>()
            .all(&*self.connection)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.author, row.book_count as u64))
            .collect())
    }

    /// Insert a new record; the store assigns the id
    pub async fn insert(
        &self,
        fields: &BookFields,
        image_file: Option<String>,
    ) -> Result<Book, DbErr> {
        let now = chrono::Utc::now();

        let active_model = books::ActiveModel {
            id: NotSet,
            title: Set(fields.title.clone()),
            author: Set(fields.author.clone()),
            publisher: Set(fields.publisher.clone()),
            first_publish_year: Set(fields.first_publish_year),
            image_file: Set(image_file),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&*self.connection).await?;
        Ok(Self::model_to_domain(model))
    }

    /// Find a record by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Book>, DbErr> {
        let model = Books::find_by_id(id).one(&*self.connection).await?;
        Ok(model.map(Self::model_to_domain))
    }

    /// Delete a record by id, returning the removed snapshot
    pub async fn delete_by_id(&self, id: i64) -> Result<Option<Book>, DbErr> {
        let txn = self.connection.begin().await?;

        let Some(model) = Books::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let snapshot = Self::model_to_domain(model.clone());
        model.delete(&txn).await?;
        txn.commit().await?;

        Ok(Some(snapshot))
    }

    /// Replace every field of an existing record
    pub async fn replace(
        &self,
        id: i64,
        fields: &BookFields,
        image_file: Option<String>,
    ) -> Result<Option<Book>, DbErr> {
        let txn = self.connection.begin().await?;

        let Some(existing) = Books::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut active_model: books::ActiveModel = existing.into();
        active_model.title = Set(fields.title.clone());
        active_model.author = Set(fields.author.clone());
        active_model.publisher = Set(fields.publisher.clone());
        active_model.first_publish_year = Set(fields.first_publish_year);
        active_model.image_file = Set(image_file);
        active_model.updated_at = Set(chrono::Utc::now());

        let model = active_model.update(&txn).await?;
        txn.commit().await?;

        Ok(Some(Self::model_to_domain(model)))
    }

    /// Apply a partial update; absent fields retain their stored values
    pub async fn patch(
        &self,
        id: i64,
        patch: &BookPatch,
        image_file: Option<String>,
    ) -> Result<Option<Book>, DbErr> {
        let txn = self.connection.begin().await?;

        let Some(existing) = Books::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut active_model: books::ActiveModel = existing.into();
        if let Some(title) = &patch.title {
            active_model.title = Set(title.clone());
        }
        if let Some(author) = &patch.author {
            active_model.author = Set(author.clone());
        }
        if let Some(publisher) = &patch.publisher {
            active_model.publisher = Set(publisher.clone());
        }
        if let Some(year) = patch.first_publish_year {
            active_model.first_publish_year = Set(year);
        }
        if let Some(file) = image_file {
            active_model.image_file = Set(Some(file));
        }
        active_model.updated_at = Set(chrono::Utc::now());

        let model = active_model.update(&txn).await?;
        txn.commit().await?;

        Ok(Some(Self::model_to_domain(model)))
    }

    /// Convert SeaORM model to domain model
    fn model_to_domain(model: books::Model) -> Book {
        Book {
            id: model.id,
            title: model.title,
            author: model.author,
            publisher: model.publisher,
            first_publish_year: model.first_publish_year,
            image_file: model.image_file,
            source: BookSource::Database,
        }
    }
}
