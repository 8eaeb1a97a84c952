mod auth_tests;
mod chat_tests;
mod contact_tests;
mod health_tests;
mod message_tests;
mod realtime_tests;
