// Room engine: codes, rooms, registry, broadcast
pub mod core;

// Error taxonomy
pub mod error;

// Environment-driven settings
pub mod config;

// Seat tokens
pub mod auth;

// Middleware
pub mod middleware;

// Services (gateway, background tasks)
pub mod services;

// API models (requests/responses)
pub mod models;

// HTTP and WebSocket routes
pub mod routes;

// Application state
pub mod state;
