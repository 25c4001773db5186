//! # Events Module
//!
//! Progress reporting for long-running catalogue work (scanning folders,
//! indexing photos). The core sends events down a channel; the CLI or any
//! other front end drains them.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Scan(ScanEvent::Progress(p)) => println!("Found {} photos", p.photos_found),
//!             Event::Index(IndexEvent::Progress(p)) => println!("Indexed {}/{}", p.completed, p.total),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! indexer.run_with_events(&catalog, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
