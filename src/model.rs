pub mod directions_api_model;
pub mod itinerary;
pub mod map_view;
pub mod passenger;
pub mod stop;
