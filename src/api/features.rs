use rocket::{serde::json::Json, Route, State};

use crate::config::Config;

pub fn routes() -> Vec<Route> {
    routes![feature_flags]
}

/// The feature flags switched on for this deployment.
#[get("/features")]
fn feature_flags(config: &State<Config>) -> Json<Vec<String>> {
    Json(config.feature_flags().to_vec())
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;

    #[backend_test]
    async fn flags_are_public(client: Client) {
        let response = client.get(uri!(feature_flags)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let flags: Vec<String> = response.into_json().await.unwrap();
        let config = client.rocket().state::<Config>().unwrap();
        assert_eq!(flags, config.feature_flags());
    }
}
