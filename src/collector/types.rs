use serde::Serialize;

/// A post tile harvested from the hashtag feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostReference {
    /// Absolute URL of the post detail page.
    pub link: String,
    /// Thumbnail URL.
    pub image: String,
    /// Caption, taken from the thumbnail's alt text.
    pub text: Option<String>,
}

/// Like or view count of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PopularityCount {
    /// Count as rendered by the site, e.g. `"1,204"`.
    Displayed(String),
    /// Number of anchors in the engagement container. A lower bound used
    /// when the rendered count is missing.
    AnchorProxy(usize),
}

impl std::fmt::Display for PopularityCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Displayed(s) => f.write_str(s),
            Self::AnchorProxy(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PostKind {
    Video {
        video: String,
        views: PopularityCount,
    },
    Photo {
        likes: PopularityCount,
    },
}

impl PostKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Video { .. } => "video",
            Self::Photo { .. } => "photo",
        }
    }

    #[must_use]
    pub fn popularity(&self) -> &PopularityCount {
        match self {
            Self::Video { views, .. } => views,
            Self::Photo { likes } => likes,
        }
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video { .. })
    }
}

/// Attributes read from a post's detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(flatten)]
    pub kind: PostKind,
}

/// One collected post. `enrichment` is `None` when the detail page could not
/// be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    #[serde(flatten)]
    pub reference: PostReference,
    #[serde(flatten)]
    pub enrichment: Option<Enrichment>,
}

impl PostRecord {
    #[must_use]
    pub fn bare(reference: PostReference) -> Self {
        Self {
            reference,
            enrichment: None,
        }
    }

    #[must_use]
    pub fn is_enriched(&self) -> bool {
        self.enrichment.is_some()
    }

    #[must_use]
    pub fn kind(&self) -> Option<&PostKind> {
        self.enrichment.as_ref().map(|e| &e.kind)
    }
}

/// Output of a full collection run.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResult {
    pub hashtag: String,
    pub posts: Vec<PostRecord>,
    pub error_count: usize,
    pub elapsed_seconds: u64,
}

impl CollectionResult {
    /// Number of posts whose detail page was read.
    #[must_use]
    pub fn collected(&self) -> usize {
        self.posts.iter().filter(|p| p.is_enriched()).count()
    }
}
