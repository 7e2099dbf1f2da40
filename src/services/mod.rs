/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Reactive leaderboard aggregation.
pub mod leaderboard_service;
/// Participant joins and answer submission.
pub mod participant_service;
/// Question bank loading and seeding.
pub mod question_service;
/// Room creation and admin room views.
pub mod room_service;
/// Rank-weighted score computation.
pub mod scoring;
/// Session lifecycle, timers and end-of-question settlement.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
