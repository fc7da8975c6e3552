pub mod firebase;

pub use firebase::FirebaseStorageClient;
