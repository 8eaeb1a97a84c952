//! In-Memory Repositories
//!
//! Process-local implementations of the domain repository traits, backed by
//! `parking_lot::RwLock` maps. Selected with `database.backend = "memory"`
//! and used by the test-suite. State is lost on restart.

mod chats;
mod contacts;
mod messages;
mod users;

pub use chats::MemoryChatRepository;
pub use contacts::MemoryContactRepository;
pub use messages::MemoryMessageRepository;
pub use users::MemoryUserRepository;
