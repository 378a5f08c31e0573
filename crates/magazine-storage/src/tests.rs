use crate::entities::{ai_setting, approved_article, rewritten_article};
use crate::store::{
    AiSettingInput, ApproveOverrides, CallbackOutcome, ContentStore, DraftFilter, DraftUpdate,
    KeywordConversion, NewDraft, NewMedia, NewSourceArticle, NewUser, UserUpdate,
};
use crate::StorageError;
use magazine_common::types::{
    ConvertedArticle, DraftStatus, KeywordRewriteCallback, MediaType,
    PublishStatus, RewriteStatus, ScrapeJobCallback, ScrapeJobStatus, UserRole,
};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use tempfile::TempDir;

async fn setup() -> (TempDir, ContentStore) {
    magazine_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("magazine.db").display());
    let store = ContentStore::new(&url, dir.path()).await.unwrap();
    (dir, store)
}

fn draft(title: &str, category_id: &str) -> NewDraft {
    NewDraft {
        title: title.to_string(),
        content: format!("<p>{title} body</p>"),
        category_id: Some(category_id.to_string()),
        ..Default::default()
    }
}

fn completed_callback(id: &str) -> KeywordRewriteCallback {
    KeywordRewriteCallback {
        rewrite_id: id.to_string(),
        status: RewriteStatus::Completed,
        source_url: Some("https://example.com/covid".to_string()),
        source_title: Some("Covid update".to_string()),
        source_content: Some("original".to_string()),
        rewritten_content: Some("rewritten text".to_string()),
        error_message: None,
        all_articles: Some(serde_json::json!([{"title": "a"}])),
    }
}

async fn approved_rows(store: &ContentStore) -> u64 {
    approved_article::Entity::find()
        .count(store.db())
        .await
        .unwrap()
}

#[tokio::test]
async fn approve_moves_draft_into_published_article() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let d = store.create_draft(draft("AI chips", &cat.id)).await.unwrap();
    assert_eq!(d.status, DraftStatus::Pending);
    assert_eq!(d.slug, "ai-chips");

    let article = store
        .approve_draft(&d.id, &ApproveOverrides::default())
        .await
        .unwrap();

    assert_eq!(article.title, d.title);
    assert_eq!(article.content, d.content);
    assert_eq!(article.category_id, d.category_id);
    assert_eq!(article.status, PublishStatus::Published);
    assert!(article.published_at.is_some());
    assert!(!article.ai_generated);
    assert_eq!(approved_rows(&store).await, 1);
    assert!(store.get_draft(&d.id).await.unwrap().is_none());

    // a second approval sees the draft gone
    let err = store
        .approve_draft(&d.id, &ApproveOverrides::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn approve_rolls_back_when_draft_delete_fails() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let d = store.create_draft(draft("Rollback", &cat.id)).await.unwrap();

    store
        .db()
        .execute_unprepared(
            "CREATE TRIGGER fail_draft_delete BEFORE DELETE ON rewritten_articles \
             BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
        )
        .await
        .unwrap();

    let err = store
        .approve_draft(&d.id, &ApproveOverrides::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Database(_)));

    assert_eq!(approved_rows(&store).await, 0);
    let still_there = store.get_draft(&d.id).await.unwrap().unwrap();
    assert_eq!(still_there.status, DraftStatus::Pending);
    assert_eq!(still_there.title, d.title);
}

#[tokio::test]
async fn approve_with_taken_slug_is_a_validation_error() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let first = store.create_draft(draft("Same", &cat.id)).await.unwrap();
    store
        .approve_draft(&first.id, &ApproveOverrides::default())
        .await
        .unwrap();

    // explicit duplicate is rejected on create
    let err = store
        .create_draft(NewDraft {
            slug: Some("same".to_string()),
            ..draft("Same", &cat.id)
        })
        .await
        .unwrap_err();
    match err {
        StorageError::Validation(fields) => assert!(fields.contains_key("slug")),
        other => panic!("unexpected error: {other:?}"),
    }

    // derived slugs get a suffix instead
    let second = store.create_draft(draft("Same", &cat.id)).await.unwrap();
    assert_eq!(second.slug, "same-2");
}

#[tokio::test]
async fn approve_applies_overrides() {
    let (_dir, store) = setup().await;
    let tech = store.create_category("Tech", None, None).await.unwrap();
    let science = store.create_category("Science", None, None).await.unwrap();
    let d = store.create_draft(draft("Override", &tech.id)).await.unwrap();

    let when = chrono::Utc::now() - chrono::Duration::days(2);
    let article = store
        .approve_draft(
            &d.id,
            &ApproveOverrides {
                category_id: Some(science.id.clone()),
                featured_image_id: None,
                published_at: Some(when),
            },
        )
        .await
        .unwrap();
    assert_eq!(article.category_id.as_deref(), Some(science.id.as_str()));
    assert_eq!(
        article.published_at.map(|t| t.timestamp()),
        Some(when.timestamp())
    );
}

#[tokio::test]
async fn deleting_media_detaches_featured_image() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let image = store
        .insert_media(NewMedia {
            id: magazine_common::id::next_id(),
            name: "cover".to_string(),
            file_name: "cover.png".to_string(),
            file_path: "images/2026/10/cover.png".to_string(),
            mime_type: "image/png".to_string(),
            size: 8,
            media_type: MediaType::Image,
            user_id: None,
        })
        .await
        .unwrap();
    let d = store.create_draft(draft("Cover story", &cat.id)).await.unwrap();
    let article = store
        .approve_draft(
            &d.id,
            &ApproveOverrides {
                featured_image_id: Some(image.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(article.featured_image_id.as_deref(), Some(image.id.as_str()));

    let removed = store.delete_media(&image.id).await.unwrap();
    assert_eq!(removed.file_path, "images/2026/10/cover.png");
    assert!(store.get_media(&image.id).await.unwrap().is_none());

    let article = store.get_approved_article(&article.id).await.unwrap().unwrap();
    assert!(article.featured_image_id.is_none());

    let err = store.delete_media(&image.id).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn reject_updates_in_place() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let d = store.create_draft(draft("Meh", &cat.id)).await.unwrap();
    let before = rewritten_article::Entity::find()
        .count(store.db())
        .await
        .unwrap();

    let rejected = store
        .reject_draft(&d.id, Some("off topic".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.status, DraftStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("off topic"));

    // second rejection is a no-op
    let again = store.reject_draft(&d.id, None).await.unwrap();
    assert_eq!(again.rejection_reason.as_deref(), Some("off topic"));

    let after = rewritten_article::Entity::find()
        .count(store.db())
        .await
        .unwrap();
    assert_eq!(before, after);
    assert_eq!(approved_rows(&store).await, 0);

    let resubmitted = store
        .update_draft(
            &d.id,
            DraftUpdate {
                title: Some("Better".to_string()),
                resubmit: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(resubmitted.status, DraftStatus::Pending);
    assert!(resubmitted.rejection_reason.is_none());
}

#[tokio::test]
async fn draft_filters_by_status() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let a = store.create_draft(draft("One", &cat.id)).await.unwrap();
    store.create_draft(draft("Two", &cat.id)).await.unwrap();
    store.reject_draft(&a.id, None).await.unwrap();

    let filter = DraftFilter {
        status: Some(DraftStatus::Pending),
        ..Default::default()
    };
    assert_eq!(store.count_drafts(&filter).await.unwrap(), 1);
    let rows = store.list_drafts(&filter, 10, 0).await.unwrap();
    assert_eq!(rows[0].title, "Two");
}

#[tokio::test]
async fn duplicate_category_name_fails_validation() {
    let (_dir, store) = setup().await;
    store.create_category("Tech", None, None).await.unwrap();
    let err = store
        .create_category("Tech", Some("tech-2"), None)
        .await
        .unwrap_err();
    match err {
        StorageError::Validation(fields) => {
            assert!(fields.contains_key("name"));
            assert!(!fields.contains_key("slug"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // soft-deleted categories free their name
    let tech = store.get_category_by_slug("tech").await.unwrap().unwrap();
    store.delete_category(&tech.id).await.unwrap();
    assert!(store.create_category("Tech", None, None).await.is_ok());
}

#[tokio::test]
async fn keyword_callback_updates_only_its_record() {
    let (_dir, store) = setup().await;
    let a = store.create_keyword_rewrite("covid-19", None).await.unwrap();
    let b = store.create_keyword_rewrite("elections", None).await.unwrap();
    assert_eq!(a.status, RewriteStatus::Pending);

    let a = store.mark_keyword_dispatched(&a.id).await.unwrap();
    assert_eq!(a.status, RewriteStatus::Processing);

    let outcome = store
        .apply_keyword_callback(&completed_callback(&a.id))
        .await
        .unwrap();
    let updated = match outcome {
        CallbackOutcome::Applied(r) => r,
        CallbackOutcome::Duplicate(_) => panic!("first delivery should apply"),
    };
    assert_eq!(updated.status, RewriteStatus::Completed);
    assert_eq!(updated.rewritten_content.as_deref(), Some("rewritten text"));
    assert!(updated.completed_at.is_some());
    assert!(updated.all_articles.is_some());

    let untouched = store.get_keyword_rewrite(&b.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, RewriteStatus::Pending);
    assert!(untouched.rewritten_content.is_none());

    // redelivery is acknowledged without a write
    let again = store
        .apply_keyword_callback(&completed_callback(&a.id))
        .await
        .unwrap();
    assert!(matches!(again, CallbackOutcome::Duplicate(_)));

    // flipping a terminal state is a conflict
    let mut failed = completed_callback(&a.id);
    failed.status = RewriteStatus::Failed;
    let err = store.apply_keyword_callback(&failed).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    let err = store
        .apply_keyword_callback(&completed_callback("999"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn opposite_callbacks_settle_on_one_outcome() {
    let (_dir, store) = setup().await;
    let r = store.create_keyword_rewrite("race", None).await.unwrap();
    store.mark_keyword_dispatched(&r.id).await.unwrap();

    let completed = completed_callback(&r.id);
    let mut failed = completed_callback(&r.id);
    failed.status = RewriteStatus::Failed;
    let (a, b) = tokio::join!(
        store.apply_keyword_callback(&completed),
        store.apply_keyword_callback(&failed)
    );
    let winner = match (a, b) {
        (Ok(CallbackOutcome::Applied(w)), Err(StorageError::Conflict(_)))
        | (Err(StorageError::Conflict(_)), Ok(CallbackOutcome::Applied(w))) => w,
        other => panic!("expected one applied and one conflict, got {other:?}"),
    };
    let stored = store.get_keyword_rewrite(&r.id).await.unwrap().unwrap();
    assert_eq!(stored.status, winner.status);

    let job = store
        .create_scrape_job("https://facebook.com/groups/race", 5, None)
        .await
        .unwrap();
    store.mark_scrape_job_running(&job.id).await.unwrap();
    let done = ScrapeJobCallback {
        job_id: job.id.clone(),
        status: ScrapeJobStatus::Completed,
        posts_found: Some(4),
        error_message: None,
    };
    let broke = ScrapeJobCallback {
        status: ScrapeJobStatus::Failed,
        posts_found: None,
        error_message: Some("blocked".to_string()),
        ..done.clone()
    };
    let (a, b) = tokio::join!(
        store.apply_scrape_callback(&done),
        store.apply_scrape_callback(&broke)
    );
    let winner = match (a, b) {
        (Ok(CallbackOutcome::Applied(w)), Err(StorageError::Conflict(_)))
        | (Err(StorageError::Conflict(_)), Ok(CallbackOutcome::Applied(w))) => w,
        other => panic!("expected one applied and one conflict, got {other:?}"),
    };
    let stored = store.get_scrape_job(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, winner.status);
}

#[tokio::test]
async fn dispatch_result_never_overwrites_an_early_callback() {
    let (_dir, store) = setup().await;
    let r = store.create_keyword_rewrite("fast", None).await.unwrap();
    store
        .apply_keyword_callback(&completed_callback(&r.id))
        .await
        .unwrap();

    let after = store.mark_keyword_dispatched(&r.id).await.unwrap();
    assert_eq!(after.status, RewriteStatus::Completed);
    let after = store
        .mark_keyword_dispatch_failed(&r.id, "timeout")
        .await
        .unwrap();
    assert_eq!(after.status, RewriteStatus::Completed);
    assert!(after.error_message.is_none());
}

#[tokio::test]
async fn retry_is_only_allowed_from_failed() {
    let (_dir, store) = setup().await;
    let r = store.create_keyword_rewrite("retry me", None).await.unwrap();
    let err = store.reset_keyword_for_retry(&r.id).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidTransition { .. }));

    let failed = store
        .mark_keyword_dispatch_failed(&r.id, "connection refused")
        .await
        .unwrap();
    assert_eq!(failed.status, RewriteStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("connection refused"));

    let reset = store.reset_keyword_for_retry(&r.id).await.unwrap();
    assert_eq!(reset.status, RewriteStatus::Pending);
    assert!(reset.error_message.is_none());
    assert!(reset.completed_at.is_none());
}

#[tokio::test]
async fn convert_completed_rewrite_into_draft_or_article() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Health", None, None).await.unwrap();
    let r = store.create_keyword_rewrite("covid-19", None).await.unwrap();

    let err = store
        .convert_keyword_rewrite(
            &r.id,
            KeywordConversion {
                category_id: cat.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidTransition { .. }));

    store
        .apply_keyword_callback(&completed_callback(&r.id))
        .await
        .unwrap();

    let converted = store
        .convert_keyword_rewrite(
            &r.id,
            KeywordConversion {
                category_id: cat.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    match converted {
        ConvertedArticle::Draft(d) => {
            assert_eq!(d.title, "Covid update");
            assert_eq!(d.content, "rewritten text");
            assert_eq!(d.keyword_rewrite_id.as_deref(), Some(r.id.as_str()));
            assert!(d.is_ai_generated());
        }
        ConvertedArticle::Published(_) => panic!("expected a draft"),
    }

    // 每条改写记录只能转换一次
    let err = store
        .convert_keyword_rewrite(
            &r.id,
            KeywordConversion {
                category_id: cat.id.clone(),
                publish: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    let record = store.get_keyword_rewrite(&r.id).await.unwrap().unwrap();
    assert!(record.converted_at.is_some());
    assert_eq!(approved_rows(&store).await, 0);

    let other = store.create_keyword_rewrite("covid-19", None).await.unwrap();
    store
        .apply_keyword_callback(&completed_callback(&other.id))
        .await
        .unwrap();
    let published = store
        .convert_keyword_rewrite(
            &other.id,
            KeywordConversion {
                category_id: cat.id.clone(),
                title: Some("Covid explained".to_string()),
                publish: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    match published {
        ConvertedArticle::Published(a) => {
            assert_eq!(a.slug, "covid-explained");
            assert!(a.ai_generated);
        }
        ConvertedArticle::Draft(_) => panic!("expected a published article"),
    }
}

#[tokio::test]
async fn failed_conversion_leaves_the_rewrite_convertible() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Health", None, None).await.unwrap();
    store
        .create_draft(NewDraft {
            slug: Some("taken".to_string()),
            ..draft("Taken", &cat.id)
        })
        .await
        .unwrap();
    let r = store.create_keyword_rewrite("covid-19", None).await.unwrap();
    store
        .apply_keyword_callback(&completed_callback(&r.id))
        .await
        .unwrap();

    let err = store
        .convert_keyword_rewrite(
            &r.id,
            KeywordConversion {
                category_id: cat.id.clone(),
                slug: Some("taken".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
    let record = store.get_keyword_rewrite(&r.id).await.unwrap().unwrap();
    assert!(record.converted_at.is_none());

    let converted = store
        .convert_keyword_rewrite(
            &r.id,
            KeywordConversion {
                category_id: cat.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(matches!(converted, ConvertedArticle::Draft(_)));
}

#[tokio::test]
async fn article_rewrite_flags_the_source() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let src = store
        .insert_source_article(NewSourceArticle {
            title: "Original".to_string(),
            slug: None,
            content: "scraped".to_string(),
            source_url: None,
            source_name: Some("Wire".to_string()),
            source_icon: None,
        })
        .await
        .unwrap();
    assert!(!src.is_processed);

    let d = store
        .record_article_rewrite(&src.id, draft("Rewritten", &cat.id))
        .await
        .unwrap();
    assert_eq!(d.original_article_id.as_deref(), Some(src.id.as_str()));

    let src = store.get_source_article(&src.id).await.unwrap().unwrap();
    assert!(src.is_processed);
    assert!(src.is_ai_rewritten);
    assert_eq!(store.count_source_articles(Some(false)).await.unwrap(), 0);

    let article = store
        .approve_draft(&d.id, &ApproveOverrides::default())
        .await
        .unwrap();
    assert!(article.ai_generated);
    assert_eq!(article.original_article_id.as_deref(), Some(src.id.as_str()));
}

#[tokio::test]
async fn scrape_job_lifecycle() {
    let (_dir, store) = setup().await;
    let job = store
        .create_scrape_job("https://facebook.com/groups/ai", 20, None)
        .await
        .unwrap();
    assert_eq!(job.status, ScrapeJobStatus::Pending);

    let job = store.mark_scrape_job_running(&job.id).await.unwrap();
    assert_eq!(job.status, ScrapeJobStatus::Running);
    assert!(job.started_at.is_some());

    let cb = ScrapeJobCallback {
        job_id: job.id.clone(),
        status: ScrapeJobStatus::Completed,
        posts_found: Some(12),
        error_message: None,
    };
    let done = store.apply_scrape_callback(&cb).await.unwrap().into_inner();
    assert_eq!(done.posts_found, Some(12));
    assert!(done.finished_at.is_some());

    // process watcher arriving late leaves the reported result alone
    assert!(!store.fail_scrape_job(&job.id, "exit status 1").await.unwrap());
    let job = store.get_scrape_job(&job.id).await.unwrap().unwrap();
    assert_eq!(job.status, ScrapeJobStatus::Completed);
}

#[tokio::test]
async fn ai_api_key_is_encrypted_at_rest() {
    let (_dir, store) = setup().await;
    let saved = store
        .upsert_ai_setting(AiSettingInput {
            provider: "openai".to_string(),
            api_key: Some("sk-secret-1234".to_string()),
            model_name: "gpt-4o".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(2048),
            is_active: true,
        })
        .await
        .unwrap();
    assert_eq!(saved.api_key.as_deref(), Some("sk-secret-1234"));

    let raw = ai_setting::Entity::find()
        .one(store.db())
        .await
        .unwrap()
        .unwrap();
    assert_ne!(raw.api_key.as_deref(), Some("sk-secret-1234"));

    // omitting the key keeps it
    let updated = store
        .upsert_ai_setting(AiSettingInput {
            provider: "openai".to_string(),
            api_key: None,
            model_name: "gpt-4o-mini".to_string(),
            temperature: None,
            max_tokens: None,
            is_active: true,
        })
        .await
        .unwrap();
    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.api_key.as_deref(), Some("sk-secret-1234"));
    assert_eq!(updated.model_name, "gpt-4o-mini");

    let active = store.get_active_ai_setting().await.unwrap().unwrap();
    assert_eq!(active.provider, "openai");
}

#[tokio::test]
async fn password_change_revokes_tokens() {
    let (_dir, store) = setup().await;
    let user = store
        .create_user(NewUser {
            name: "Editor".to_string(),
            email: "Editor@Example.com".to_string(),
            password_hash: crate::auth::hash_password("password1").unwrap(),
            role: UserRole::Editor,
            is_active: true,
        })
        .await
        .unwrap();
    assert_eq!(user.email, "editor@example.com");
    assert_eq!(user.token_version, 0);

    let renamed = store
        .update_user(
            &user.id,
            UserUpdate {
                name: Some("Ed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.token_version, 0);

    let changed = store
        .update_user(
            &user.id,
            UserUpdate {
                password_hash: Some(crate::auth::hash_password("password2").unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(changed.token_version, 1);

    let err = store
        .create_user(NewUser {
            name: "Dup".to_string(),
            email: "editor@example.com".to_string(),
            password_hash: "x".to_string(),
            role: UserRole::Editor,
            is_active: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
}

#[tokio::test]
async fn dashboard_counts_reflect_content() {
    let (_dir, store) = setup().await;
    let cat = store.create_category("Tech", None, None).await.unwrap();
    let a = store.create_draft(draft("A", &cat.id)).await.unwrap();
    let b = store.create_draft(draft("B", &cat.id)).await.unwrap();
    store.create_draft(draft("C", &cat.id)).await.unwrap();
    store.reject_draft(&a.id, None).await.unwrap();
    let article = store
        .approve_draft(&b.id, &ApproveOverrides::default())
        .await
        .unwrap();
    store
        .set_publish_status(&article.id, PublishStatus::Archived)
        .await
        .unwrap();
    store.create_keyword_rewrite("k", None).await.unwrap();

    let summary = store.dashboard_summary().await.unwrap();
    assert_eq!(summary.drafts.pending, 1);
    assert_eq!(summary.drafts.rejected, 1);
    assert_eq!(summary.published_articles, 0);
    assert_eq!(summary.archived_articles, 1);
    assert_eq!(summary.keyword_rewrites.pending, 1);
    assert_eq!(summary.categories, 1);
}
