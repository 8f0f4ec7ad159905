// TabSync services
// Services provide stateless or configuration-level functionality.

pub mod settings_engine;
