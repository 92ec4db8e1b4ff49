//! Push notifikace — payloady, příjemci, fan-out na Expo.

pub mod dispatcher;
pub mod payload;
pub mod recipients;
pub mod sink;

pub use dispatcher::{is_valid_push_token, DispatchReport, Dispatcher, FAVORITE_MARKER};
pub use payload::{
    goal, match_started, prediction_result, timeline_event, Audience, NotificationKind, NotificationPayload,
    ResultNotice,
};
pub use recipients::{InMemoryDirectory, Preferences, Recipient, RecipientDirectory};
pub use sink::{DeliveryError, ExpoPushSink, PushMessage, PushSink, EXPO_MAX_BATCH, EXPO_PUSH_ENDPOINT};
