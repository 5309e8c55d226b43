use sea_orm::entity::prelude::*;

/// 已签发短码登记
///
/// 只追加。短码签发后永久占用，链接删除也不释放，
/// 防止旧码被重新注册后指向别人的内容。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "issued_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub link_id: i64,
    pub issued_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
