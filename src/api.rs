use rocket::Route;

mod auth;
mod common;
mod dashboard;
mod events;
mod features;
mod nodes;
mod question_sets;
mod questions;
mod responses;
mod users;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(users::routes());
    routes.extend(nodes::routes());
    routes.extend(events::routes());
    routes.extend(questions::routes());
    routes.extend(question_sets::routes());
    routes.extend(responses::routes());
    routes.extend(dashboard::routes());
    routes.extend(features::routes());
    routes
}
