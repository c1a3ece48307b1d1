pub mod domain;
pub mod locator;
pub mod ports;
pub mod progress;
pub mod streak;

pub use domain::{
    Book, Chapter, ChapterMark, ReadingProgress, Streak, UploadType, User, UserCredentials,
};
pub use locator::{resolve_locator, LocatorError, TrustedOrigin};
pub use ports::{
    DatabaseService, DocumentFetcher, DocumentStream, FetchError, FetchedDocument, PortError,
    PortResult,
};
pub use progress::ProgressUpdate;
