use super::{HttpRequest, HttpResponse};

/// A recorded request paired with its response. Identity is structural
/// (derived `Hash`/`Eq` over both sides), so two pairs read from different
/// trace files compare equal iff their wire content is identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

impl Pair {
    pub fn new(request: HttpRequest, response: HttpResponse) -> Self {
        Self { request, response }
    }
}
