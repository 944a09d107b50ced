pub mod draft_trip;
pub mod geo_point;
pub mod trip;
