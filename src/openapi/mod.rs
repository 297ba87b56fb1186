use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FleetMatch API",
        version = "0.1.0",
        description = r#"
# FleetMatch Freight API

Matches freight shipments to available trucks and tracks each shipment from creation to delivery.

## Lifecycle

`PENDING -> ASSIGNED -> IN_TRANSIT -> DELIVERED`

- Creating a shipment returns the feasible trucks, cheapest first.
- Booking a truck moves the shipment to `ASSIGNED` and takes the truck out of the pool.
- Delivery settles cost and CO2 and returns the truck to the pool.

A status change that is not the immediate successor is rejected with `409`, as is booking a
truck that is no longer available.

## Error Handling

Every error uses the same body:

```json
{
  "error": "Conflict",
  "message": "Conflict: truck 7f1c... is no longer available",
  "request_id": "req-abc123",
  "timestamp": "2025-03-01T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "shipments", description = "Shipment creation, matching, booking and lifecycle"),
        (name = "trucks", description = "Dealer truck registry"),
        (name = "users", description = "Warehouse, dealer and admin accounts"),
        (name = "messages", description = "Per-shipment chat"),
        (name = "analytics", description = "Delivered-trip analytics"),
        (name = "admin", description = "Back-office overview and user removal"),
        (name = "routes", description = "Route optimization proxy")
    ),
    paths(
        handlers::shipments::create_shipment,
        handlers::shipments::list_shipments,
        handlers::shipments::get_shipment,
        handlers::shipments::book_truck,
        handlers::shipments::advance_status,
        handlers::shipments::patch_shipment,
        handlers::shipments::dealer_jobs,
        handlers::trucks::register_truck,
        handlers::trucks::list_trucks,
        handlers::trucks::get_truck,
        handlers::trucks::update_truck,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::messages::list_messages,
        handlers::messages::post_message,
        handlers::analytics::user_analytics,
        handlers::admin::overview,
        handlers::admin::delete_user,
        handlers::routes::optimize_route,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::ResponseMeta,
            crate::entities::ShipmentStatus,
            crate::entities::UserRole,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
