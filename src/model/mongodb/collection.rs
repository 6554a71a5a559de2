use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    event::{Event, NewEvent},
    node::{NewNode, Node},
    profile::UserProfile,
    question::{NewQuestion, Question},
    question_set::{NewQuestionSet, NewQuestionSuperSet, QuestionSet, QuestionSuperSet},
    response_set::{NewResponseSet, ResponseSet},
    satellite::Satellite,
    user::{NewUser, User},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

macro_rules! collection {
    ($name:literal: $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

collection!("users": User, NewUser);
collection!("profiles": UserProfile);
collection!("nodes": Node, NewNode);
collection!("events": Event, NewEvent);
collection!("questions": Question, NewQuestion);
collection!("question_sets": QuestionSet, NewQuestionSet);
collection!("question_super_sets": QuestionSuperSet, NewQuestionSuperSet);
collection!("response_sets": ResponseSet, NewResponseSet);

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    let user_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    let profile_index = IndexModel::builder()
        .keys(doc! {"user_id": 1})
        .options(unique)
        .build();
    Coll::<UserProfile>::from_db(db)
        .create_index(profile_index, None)
        .await?;

    // Satellite records are always looked up by event.
    for satellite in [Satellite::Impact, Satellite::Quality, Satellite::Demographic] {
        let event_index = IndexModel::builder().keys(doc! {"event_id": 1}).build();
        db.collection::<mongodb::bson::Document>(satellite.collection_name())
            .create_index(event_index, None)
            .await?;
    }

    Ok(())
}
