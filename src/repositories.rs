use crate::domain::{SoundboardRepository, UserRepository};
use crate::errors::RepoError;
use crate::models::{CoverImage, SoundClip, Soundboard, SoundboardSummary, User};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{Client as DynamoDbClient, error::SdkError, types::AttributeValue};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

pub const SOUNDBOARDS_TABLE: &str = "soundboards";
pub const USERS_TABLE: &str = "users";

#[derive(Debug, Clone)]
pub struct DynamoDbSoundboardRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbSoundboardRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbSoundboardRepository");
        Self { client, table_name }
    }

    fn put_request(&self, board: &Soundboard) -> aws_sdk_dynamodb::operation::put_item::builders::PutItemFluentBuilder {
        let sounds = AttributeValue::L(board.sounds.iter().map(clip_to_av).collect());
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("board_id", AttributeValue::S(board.id.to_string()))
            .item("title", AttributeValue::S(board.title.clone()))
            .item("creator", AttributeValue::S(board.creator.to_string()))
            .item("sounds", sounds);
        if let Some(description) = &board.description {
            request = request.item("description", AttributeValue::S(description.clone()));
        }
        if let Some(image) = &board.image {
            request = request.item(
                "image_content_type",
                AttributeValue::S(image.content_type.clone()),
            );
        }
        request
    }
}

#[async_trait]
impl SoundboardRepository for DynamoDbSoundboardRepository {
    /// PutItem guarded by `attribute_not_exists(board_id)` so a freshly
    /// generated board id can never clobber an existing aggregate.
    async fn create(&self, board: &Soundboard) -> Result<(), RepoError> {
        self.put_request(board)
            .condition_expression("attribute_not_exists(board_id)")
            .send()
            .await
            .map_err(|sdk_err| {
                if let SdkError::ServiceError(service_err) = &sdk_err
                    && service_err.err().is_conditional_check_failed_exception()
                {
                    return RepoError::Conflict(board.id.to_string());
                }
                RepoError::BackendError(anyhow::Error::new(sdk_err).context(format!(
                    "DynamoDB (table: {}): Failed to create board (id: {})",
                    self.table_name, board.id
                )))
            })?;
        Ok(())
    }

    /// Plain PutItem replace of the whole aggregate. Concurrent edits to
    /// the same board are last-writer-wins at item granularity; there is no
    /// version check.
    async fn replace(&self, board: &Soundboard) -> Result<(), RepoError> {
        self.put_request(board)
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to replace board (id: {})",
                self.table_name, board.id
            ))
            .map_err(RepoError::BackendError)?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Soundboard>, RepoError> {
        let id_str = id.to_string();
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("board_id", AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to get board (id: {})",
                self.table_name, id_str
            ))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => match item_to_board(&item) {
                Some(board) => Ok(Some(board)),
                None => {
                    tracing::error!(board_id = %id_str, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Soundboard");
                    Err(RepoError::DataCorruption(format!(
                        "Failed to parse board data from table '{}' for id {}",
                        self.table_name, id_str
                    )))
                }
            },
            None => Ok(None),
        }
    }

    /// Scan projecting only id + title, paginated.
    async fn list_summaries(&self) -> Result<Vec<SoundboardSummary>, RepoError> {
        let mut summaries: Vec<SoundboardSummary> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.table_name)
                .projection_expression("board_id, #t")
                .expression_attribute_names("#t", "title");

            if let Some(lek) = last_evaluated_key {
                request = request.set_exclusive_start_key(Some(lek));
            }

            let resp = request
                .send()
                .await
                .context(format!(
                    "DynamoDB: Failed to scan table '{}'",
                    self.table_name
                ))
                .map_err(RepoError::BackendError)?;

            for item in resp.items.unwrap_or_default() {
                let Some(summary) = item_to_summary(&item) else {
                    let item_id = item.get("board_id").and_then(|v| v.as_s().ok());
                    tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse scan item into summary");
                    return Err(RepoError::DataCorruption(format!(
                        "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                        item_id, self.table_name
                    )));
                };
                summaries.push(summary);
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        tracing::debug!(table_name = %self.table_name, count = summaries.len(), "DynamoDB: Listed board summaries");
        Ok(summaries)
    }

    /// DeleteItem succeeds even when the item is absent.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let id_str = id.to_string();
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("board_id", AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to delete board (id: {})",
                self.table_name, id_str
            ))
            .map_err(RepoError::BackendError)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DynamoDbUserRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbUserRepository");
        Self { client, table_name }
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("external_id", AttributeValue::S(external_id.to_string()))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to get user (external_id: {})",
                self.table_name, external_id
            ))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => item_to_user(&item)
                .map(Some)
                .ok_or_else(|| {
                    RepoError::DataCorruption(format!(
                        "Failed to parse user data from table '{}' for external_id {}",
                        self.table_name, external_id
                    ))
                }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    async fn find_or_create(
        &self,
        external_id: &str,
        display_name: &str,
    ) -> Result<User, RepoError> {
        if let Some(user) = self.get_by_external_id(external_id).await? {
            return Ok(user);
        }

        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            username: display_name.to_string(),
        };

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("external_id", AttributeValue::S(user.external_id.clone()))
            .item("user_id", AttributeValue::S(user.id.to_string()))
            .item("username", AttributeValue::S(user.username.clone()))
            .condition_expression("attribute_not_exists(external_id)")
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(user_id = %user.id, "Created user on first login");
                Ok(user)
            }
            Err(sdk_err) => {
                // Lost the creation race to a concurrent first login; the
                // winner's row is authoritative.
                if let SdkError::ServiceError(service_err) = &sdk_err
                    && service_err.err().is_conditional_check_failed_exception()
                {
                    return self.get_by_external_id(external_id).await?.ok_or_else(|| {
                        RepoError::DataCorruption(format!(
                            "User row vanished after conditional put for external_id {}",
                            external_id
                        ))
                    });
                }
                Err(RepoError::BackendError(anyhow::Error::new(sdk_err).context(
                    format!(
                        "DynamoDB (table: {}): Failed to create user (external_id: {})",
                        self.table_name, external_id
                    ),
                )))
            }
        }
    }
}

// --- Item <-> model mapping helpers ---

fn clip_to_av(clip: &SoundClip) -> AttributeValue {
    let mut map = HashMap::new();
    map.insert("id".to_string(), AttributeValue::S(clip.id.to_string()));
    map.insert("title".to_string(), AttributeValue::S(clip.title.clone()));
    map.insert(
        "filename".to_string(),
        AttributeValue::S(clip.filename.clone()),
    );
    map.insert(
        "content_type".to_string(),
        AttributeValue::S(clip.content_type.clone()),
    );
    map.insert(
        "file_size".to_string(),
        AttributeValue::N(clip.file_size.to_string()),
    );
    map.insert(
        "duration".to_string(),
        AttributeValue::N(clip.duration.to_string()),
    );
    map.insert(
        "unique_id".to_string(),
        AttributeValue::S(clip.unique_id.clone()),
    );
    AttributeValue::M(map)
}

fn av_to_clip(map: &HashMap<String, AttributeValue>) -> Option<SoundClip> {
    let id = map
        .get("id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let title = map.get("title")?.as_s().ok()?.to_string();
    let filename = map.get("filename")?.as_s().ok()?.to_string();
    let content_type = map.get("content_type")?.as_s().ok()?.to_string();
    let file_size = map.get("file_size")?.as_n().ok()?.parse().ok()?;
    let duration = map.get("duration")?.as_n().ok()?.parse().ok()?;
    let unique_id = map.get("unique_id")?.as_s().ok()?.to_string();

    Some(SoundClip {
        id,
        title,
        filename,
        content_type,
        file_size,
        duration,
        unique_id,
    })
}

fn item_to_board(item: &HashMap<String, AttributeValue>) -> Option<Soundboard> {
    let id = item
        .get("board_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let title = item.get("title")?.as_s().ok()?.to_string();
    let description = match item.get("description") {
        Some(av) => Some(av.as_s().ok()?.to_string()),
        None => None,
    };
    let image = match item.get("image_content_type") {
        Some(av) => Some(CoverImage {
            content_type: av.as_s().ok()?.to_string(),
        }),
        None => None,
    };
    let creator = item
        .get("creator")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;

    let mut sounds = Vec::new();
    for av in item.get("sounds")?.as_l().ok()? {
        sounds.push(av_to_clip(av.as_m().ok()?)?);
    }

    Some(Soundboard {
        id,
        title,
        description,
        image,
        creator,
        sounds,
    })
}

fn item_to_summary(item: &HashMap<String, AttributeValue>) -> Option<SoundboardSummary> {
    let id = item
        .get("board_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let title = item.get("title")?.as_s().ok()?.to_string();
    Some(SoundboardSummary { id, title })
}

fn item_to_user(item: &HashMap<String, AttributeValue>) -> Option<User> {
    let id = item
        .get("user_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let external_id = item.get("external_id")?.as_s().ok()?.to_string();
    let username = item.get("username")?.as_s().ok()?.to_string();
    Some(User {
        id,
        external_id,
        username,
    })
}
