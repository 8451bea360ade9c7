/// Consumer-facing text messages.
///
/// None of these ever carries internal error detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Greeting,
    Searching,
    NothingFound,
    NoMoreItems,
    /// Continue is offered after a block.
    MorePrompt,
    /// Continue is no longer offered.
    AllShown,
    /// Text stand-in for an image that could not be sent.
    ImageLink(String),
}

impl Notice {
    pub fn text(&self) -> String {
        match self {
            Notice::Greeting => {
                "Hi! Send me a search query and I will reply with images 📸".to_string()
            }
            Notice::Searching => "Searching for images... 🔍".to_string(),
            Notice::NothingFound => "❌ Nothing found. Try another query.".to_string(),
            Notice::NoMoreItems => "No more new images. Try another query.".to_string(),
            Notice::MorePrompt => "Want more?".to_string(),
            Notice::AllShown => "All images have been shown.".to_string(),
            Notice::ImageLink(url) => format!("Could not send this image, here is the link: {url}"),
        }
    }
}
