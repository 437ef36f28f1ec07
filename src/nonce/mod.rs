mod finder;
mod types;

pub use finder::{find_nonces, NonceSets};
pub use types::{Nonce, NonceKind, Origin, UrlComponent};
