use std::convert::Infallible;
use std::sync::Arc;

use indexmap::IndexMap;
use mongodb::Database;
use rocket::{
    http::ContentType,
    request::{FromParam, FromRequest, Outcome, Request},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        common::access::Actor,
        metrics::{
            dashboard::{tabs, DashboardRegistry, Layout, Page, Tab, Update, Wiring},
            Group, Metrics,
        },
    },
};

pub fn routes() -> Vec<Route> {
    routes![dashboard_tabs, page_layout, page_update, page_csv]
}

/// The raw query parameters of a request, in order. Dashboard inputs are
/// looked up here by parameter name.
pub struct QueryInputs(IndexMap<String, String>);

impl QueryInputs {
    /// Input values in wiring order; absent inputs are `None`.
    fn values_for(&self, wiring: &Wiring) -> Vec<Option<String>> {
        wiring
            .inputs
            .iter()
            .map(|input| self.0.get(&input.param).cloned())
            .collect()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for QueryInputs {
    type Error = Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let inputs = req
            .uri()
            .query()
            .map(|query| {
                query
                    .segments()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Outcome::Success(Self(inputs))
    }
}

/// The group shown on a page, registered with the dashboard.
async fn wired_group<'m>(
    page: Page,
    metrics: &'m Metrics,
    registry: &DashboardRegistry,
) -> Result<(&'m Group, Arc<Wiring>)> {
    let group = metrics
        .group(page.group_key())
        .ok_or_else(|| Error::not_found(format!("Metrics group '{}'", page.group_key())))?;
    let wiring = registry.register(page, group).await;
    Ok((group, wiring))
}

#[get("/dashboard/tabs?<active>")]
fn dashboard_tabs(_actor: Actor, active: Option<&str>) -> Json<Vec<Tab>> {
    let active = active.and_then(|slug| Page::from_param(slug).ok());
    Json(tabs(active))
}

#[get("/dashboard/<page>/layout")]
async fn page_layout(
    _actor: Actor,
    page: Page,
    metrics: &State<Metrics>,
    registry: &State<DashboardRegistry>,
    db: &State<Database>,
) -> Result<Json<Layout>> {
    let (group, _) = wired_group(page, metrics, registry).await?;
    let layout = registry
        .layout(page, group, db, metrics.aliases())
        .await?;
    Ok(Json(layout.clone()))
}

/// Recompute every output of a page from the current filter inputs.
#[get("/dashboard/<page>")]
async fn page_update(
    _actor: Actor,
    page: Page,
    inputs: QueryInputs,
    metrics: &State<Metrics>,
    registry: &State<DashboardRegistry>,
    db: &State<Database>,
) -> Result<Json<Update>> {
    let (group, wiring) = wired_group(page, metrics, registry).await?;
    let update = wiring
        .invoke(group, db, metrics.aliases(), inputs.values_for(&wiring))
        .await?;
    Ok(Json(update))
}

#[get("/dashboard/<page>/csv?<field>")]
async fn page_csv(
    _actor: Actor,
    page: Page,
    field: Option<&str>,
    inputs: QueryInputs,
    metrics: &State<Metrics>,
    registry: &State<DashboardRegistry>,
    db: &State<Database>,
) -> Result<(ContentType, String)> {
    let (group, wiring) = wired_group(page, metrics, registry).await?;
    let csv = wiring
        .csv(
            group,
            db,
            metrics.aliases(),
            inputs.values_for(&wiring),
            field,
        )
        .await?;
    Ok((ContentType::CSV, csv))
}
