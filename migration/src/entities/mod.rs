pub mod click_event;
pub mod issued_code;
pub mod quota_daily;
pub mod quota_monthly;
pub mod short_link;

pub use click_event::Entity as ClickEventEntity;
pub use issued_code::Entity as IssuedCodeEntity;
pub use quota_daily::Entity as QuotaDailyEntity;
pub use quota_monthly::Entity as QuotaMonthlyEntity;
pub use short_link::Entity as ShortLinkEntity;
