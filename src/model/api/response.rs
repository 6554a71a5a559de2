use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::response_set::ResponseSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescription {
    pub question_id: ApiId,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSetDescription {
    pub id: ApiId,
    pub event_id: ApiId,
    pub question_set_id: ApiId,
    pub responses: Vec<ResponseDescription>,
    pub node: Option<ApiId>,
    pub user: ApiId,
}

impl From<ResponseSet> for ResponseSetDescription {
    fn from(response_set: ResponseSet) -> Self {
        let ResponseSet { id, response_set } = response_set;
        Self {
            id: id.into(),
            event_id: response_set.event_id.into(),
            question_set_id: response_set.question_set_id.into(),
            responses: response_set
                .responses
                .into_iter()
                .map(|response| ResponseDescription {
                    question_id: response.question_id.into(),
                    answers: response.answers,
                })
                .collect(),
            node: response_set.node.map(ApiId::from),
            user: response_set.user.into(),
        }
    }
}
