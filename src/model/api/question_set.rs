use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::{access::Actor, slug::slug_or_derive},
    db::question_set::{NewQuestionSet, NewQuestionSuperSet, QuestionSet, QuestionSuperSet},
    mongodb::Id,
};

fn derive_slug(slug: Option<String>, name: &str) -> Result<String> {
    let slug = slug_or_derive(slug, name);
    if slug.is_empty() {
        Err(Error::bad_request(format!("Cannot derive a slug for '{name}'")))
    } else {
        Ok(slug)
    }
}

/// A question set specification. Questions are listed in form order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSetSpec {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub questions: Vec<Id>,
    /// Ignored for non-superusers.
    #[serde(default)]
    pub node: Option<Id>,
    /// Owner override, honoured for superusers only.
    #[serde(default)]
    pub user: Option<Id>,
}

impl QuestionSetSpec {
    pub fn into_question_set(self, actor: &Actor) -> Result<NewQuestionSet> {
        let mut questions = Vec::with_capacity(self.questions.len());
        for id in self.questions {
            if questions.contains(&id) {
                return Err(Error::bad_request(format!("Question {id} listed twice")));
            }
            questions.push(id);
        }
        let mut set = NewQuestionSet {
            slug: derive_slug(self.slug, &self.name)?,
            name: self.name,
            questions,
            node: self.node,
            user: actor.id,
        };
        actor.stamp_with_owner(&mut set, self.user);
        Ok(set)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSetDescription {
    pub id: ApiId,
    pub name: String,
    pub slug: String,
    pub questions: Vec<ApiId>,
    pub node: Option<ApiId>,
    pub user: ApiId,
}

impl From<QuestionSet> for QuestionSetDescription {
    fn from(set: QuestionSet) -> Self {
        let QuestionSet { id, set } = set;
        Self {
            id: id.into(),
            name: set.name,
            slug: set.slug,
            questions: set.questions.into_iter().map(ApiId::from).collect(),
            node: set.node.map(ApiId::from),
            user: set.user.into(),
        }
    }
}

/// A question super-set specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSuperSetSpec {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub question_sets: Vec<Id>,
    /// Ignored for non-superusers.
    #[serde(default)]
    pub node: Option<Id>,
    /// Owner override, honoured for superusers only.
    #[serde(default)]
    pub user: Option<Id>,
}

impl QuestionSuperSetSpec {
    pub fn into_super_set(self, actor: &Actor) -> Result<NewQuestionSuperSet> {
        let mut super_set = NewQuestionSuperSet {
            slug: derive_slug(self.slug, &self.name)?,
            name: self.name,
            question_sets: self.question_sets,
            node: self.node,
            user: actor.id,
        };
        let mut seen = HashSet::new();
        super_set.question_sets.retain(|id| seen.insert(*id));
        actor.stamp_with_owner(&mut super_set, self.user);
        Ok(super_set)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSuperSetDescription {
    pub id: ApiId,
    pub name: String,
    pub slug: String,
    pub question_sets: Vec<ApiId>,
    pub node: Option<ApiId>,
    pub user: ApiId,
}

impl From<QuestionSuperSet> for QuestionSuperSetDescription {
    fn from(super_set: QuestionSuperSet) -> Self {
        let QuestionSuperSet { id, super_set } = super_set;
        Self {
            id: id.into(),
            name: super_set.name,
            slug: super_set.slug,
            question_sets: super_set.question_sets.into_iter().map(ApiId::from).collect(),
            node: super_set.node.map(ApiId::from),
            user: super_set.user.into(),
        }
    }
}
