mod attendee_list;
mod event_list;

pub use attendee_list::AttendeeListView;
pub use event_list::EventListView;
