use crate::storage::models::{NewLink, ShortLink, UpdateLink};
use migration::entities::short_link;

/// 将 Sea-ORM Model 转换为 ShortLink
pub fn model_to_short_link(model: short_link::Model) -> ShortLink {
    ShortLink {
        id: model.id,
        user_id: model.user_id,
        code: model.short_code,
        target: model.target_url,
        label: model.label,
        created_at: model.created_at,
        expires_at: model.expires_at,
        is_active: model.is_active,
        qr_asset_path: model.qr_asset_path,
    }
}

/// 将 NewLink 转换为 ActiveModel（用于插入，id 由数据库分配）
pub fn new_link_to_active_model(link: &NewLink) -> short_link::ActiveModel {
    use sea_orm::ActiveValue::*;

    short_link::ActiveModel {
        id: NotSet,
        user_id: Set(link.user_id),
        short_code: Set(link.code.clone()),
        target_url: Set(link.target.clone()),
        label: Set(link.label.clone()),
        created_at: Set(link.created_at),
        expires_at: Set(link.expires_at),
        is_active: Set(true),
        qr_asset_path: Set(link.qr_asset_path.clone()),
    }
}

/// 将 UpdateLink 转换为 ActiveModel（用于更新）
///
/// 只设置白名单内且调用方明确给出的字段，其余保持 NotSet。
/// 短码、user_id、created_at 永远不会被写入。
pub fn update_to_active_model(id: i64, update: &UpdateLink) -> short_link::ActiveModel {
    use sea_orm::ActiveValue::*;

    let mut model = short_link::ActiveModel {
        id: Set(id),
        ..Default::default()
    };

    if let Some(target) = &update.target {
        model.target_url = Set(target.clone());
    }
    if let Some(label) = &update.label {
        model.label = Set(label.clone());
    }
    if let Some(expires_at) = &update.expires_at {
        model.expires_at = Set(*expires_at);
    }
    if let Some(is_active) = update.is_active {
        model.is_active = Set(is_active);
    }
    if let Some(qr_asset_path) = &update.qr_asset_path {
        model.qr_asset_path = Set(qr_asset_path.clone());
    }

    model
}
