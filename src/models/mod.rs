pub mod feedback;
pub mod page;

pub use feedback::{
    attach_files, public_url, FeedbackPage, FeedbackRow, FeedbackView, FileRow, FileView,
    NewFeedback, NewFile, RelatedFiles,
};
pub use page::{effective_page_size, PageWindow};
