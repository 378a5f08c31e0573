use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "keyword_rewrites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub keyword: String,
    pub created_by: Option<String>,
    pub status: String,
    pub source_url: Option<String>,
    pub source_title: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub source_content: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rewritten_content: Option<String>,
    pub error_message: Option<String>,
    /// JSON array as returned by the rewrite service.
    #[sea_orm(column_type = "Text", nullable)]
    pub all_articles: Option<String>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    /// Set once the rewrite has been turned into an article.
    pub converted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
