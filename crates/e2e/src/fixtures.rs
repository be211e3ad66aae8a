//! Canned route sets imitating the public demo APIs
//!
//! These are enough for the scenario files and the integration tests to run
//! offline. They are not stateful: a created booking is not stored.

use serde_json::{json, Value};

use crate::mock::{MockResponse, MockRoute};

/// Token handed out for the default credentials
pub const FIXTURE_TOKEN: &str = "abc123fixture";

pub const FIXTURE_USERNAME: &str = "admin";
pub const FIXTURE_PASSWORD: &str = "password123";

pub fn sample_booking() -> Value {
    json!({
        "firstname": "Jim",
        "lastname": "Brown",
        "totalprice": 111,
        "depositpaid": true,
        "bookingdates": { "checkin": "2024-01-01", "checkout": "2024-01-05" },
        "additionalneeds": "Breakfast"
    })
}

pub fn sample_objects() -> Value {
    json!([
        { "id": "1", "name": "Google Pixel 6 Pro", "data": { "color": "Cloudy White", "capacity": "128 GB" } },
        { "id": "2", "name": "Apple iPhone 12 Mini, 256GB, Blue", "data": null },
        { "id": "3", "name": "Apple iPhone 12 Pro Max", "data": { "color": "Cloudy White", "capacity GB": 512 } }
    ])
}

/// restful-booker: `/auth`, `/ping` and `/booking` CRUD. Mutations need the
/// fixture token cookie, otherwise 403.
pub fn booking_routes() -> Vec<MockRoute> {
    let cookie = format!("token={}", FIXTURE_TOKEN);

    vec![
        MockRoute::post("/auth", MockResponse::json(200, json!({ "token": FIXTURE_TOKEN })))
            .when_json(json!({ "username": FIXTURE_USERNAME, "password": FIXTURE_PASSWORD })),
        MockRoute::post("/auth", MockResponse::json(200, json!({ "reason": "Bad credentials" }))),
        MockRoute::get("/ping", MockResponse::text(201, "Created")),
        MockRoute::get(
            "/booking",
            MockResponse::json(200, json!([{ "bookingid": 1 }, { "bookingid": 2 }, { "bookingid": 3 }])),
        ),
        MockRoute::get("/booking/:id", MockResponse::json(200, sample_booking())),
        MockRoute::post(
            "/booking",
            MockResponse::json(200, json!({ "bookingid": 42, "booking": sample_booking() })),
        ),
        MockRoute::put("/booking/:id", MockResponse::echo(200)).when_header("cookie", cookie.clone()),
        MockRoute::patch("/booking/:id", MockResponse::echo(200)).when_header("cookie", cookie.clone()),
        MockRoute::delete("/booking/:id", MockResponse::text(201, "Created")).when_header("cookie", cookie),
        MockRoute::any("/booking/:id", MockResponse::text(403, "Forbidden")),
    ]
}

/// restful-api.dev: `/objects` list, lookup and CRUD. Updates echo the body.
pub fn objects_routes() -> Vec<MockRoute> {
    vec![
        MockRoute::get("/objects", MockResponse::json(200, sample_objects())),
        MockRoute::get(
            "/objects/1",
            MockResponse::json(200, sample_objects()[0].clone()),
        ),
        MockRoute::get(
            "/objects/:id",
            MockResponse::json(404, json!({ "error": "Oject with id=unknown was not found." })),
        ),
        MockRoute::post(
            "/objects",
            MockResponse::json(
                200,
                json!({ "id": "ff808181932badb6", "name": "Apple MacBook Pro 16", "createdAt": "2024-11-21T14:44:16.869+00:00" }),
            ),
        ),
        MockRoute::put("/objects/:id", MockResponse::echo(200)),
        MockRoute::patch("/objects/:id", MockResponse::echo(200)),
        MockRoute::delete(
            "/objects/:id",
            MockResponse::json(200, json!({ "message": "Object has been deleted." })),
        ),
    ]
}

/// Countries GraphQL endpoint at `/graphql`. Introspection is refused.
pub fn graphql_routes() -> Vec<MockRoute> {
    vec![
        MockRoute::post(
            "/graphql",
            MockResponse::json(
                200,
                json!({ "errors": [{ "message": "GraphQL introspection is not allowed" }] }),
            ),
        )
        .when_json(json!({ "operationName": "IntrospectionQuery" })),
        MockRoute::post(
            "/graphql",
            MockResponse::json(
                200,
                json!({ "data": { "country": { "name": "Brazil", "capital": "Brasília", "currency": "BRL" } } }),
            ),
        )
        .when_json(json!({ "variables": { "code": "BR" } })),
        MockRoute::post(
            "/graphql",
            MockResponse::json(200, json!({ "errors": [{ "message": "Cannot query field \"nope\" on type \"Query\"." }] })),
        )
        .when_json(json!({ "query": "{ nope }" })),
        MockRoute::post(
            "/graphql",
            MockResponse::json(
                200,
                json!({ "data": { "__typename": "Query", "countries": [{ "code": "AD", "name": "Andorra" }] } }),
            ),
        ),
    ]
}

/// Every fixture route on one server. Point the booking and objects URLs at
/// the server root and the GraphQL URL at `/graphql`.
pub fn all_routes() -> Vec<MockRoute> {
    let mut routes = booking_routes();
    routes.extend(objects_routes());
    routes.extend(graphql_routes());
    routes
}
