/// A single discussion posting extracted from a listing row
///
/// `id` is the natural key in the collection: it is derived from the posting
/// URL, so re-crawling the same posting always maps to the same document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingRecord {
    /// Last path segment of the posting URL
    pub id: String,

    /// Posting title, taken from the link's `title` attribute
    pub title: String,

    /// Display name of the posting author
    pub owner: String,

    /// Last-response time exactly as rendered by the listing page
    pub time_last_response: String,

    /// Link to the posting detail page
    pub url_posting: String,

    /// Link to the owner's profile page
    pub url_owner: String,

    /// Wall-clock time of extraction, milliseconds since the Unix epoch
    pub time_updated: i64,
}
