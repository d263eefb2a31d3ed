//! Repositories for poster generation history.

use sqlx::PgPool;
use studio_core::types::DbId;

use crate::models::poster_generation::{
    CharacterVisualGeneration, CreateCharacterVisualGeneration, CreateSeriesPosterGeneration,
    SeriesPosterGeneration,
};

const CHARACTER_COLUMNS: &str = "id, character_id, prompt, visual_style, generation_type, \
     image_url, status, error_message, is_selected, model_used, created_at";

const SERIES_COLUMNS: &str = "id, series_id, prompt, visual_style, image_url, status, \
     error_message, is_selected, model_used, created_at";

pub struct CharacterVisualGenerationRepo;

impl CharacterVisualGenerationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCharacterVisualGeneration,
    ) -> Result<CharacterVisualGeneration, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_visual_generations \
                (character_id, prompt, visual_style, generation_type, image_url, status, \
                 error_message, is_selected, model_used) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {CHARACTER_COLUMNS}"
        );
        sqlx::query_as::<_, CharacterVisualGeneration>(&query)
            .bind(input.character_id)
            .bind(&input.prompt)
            .bind(&input.visual_style)
            .bind(&input.generation_type)
            .bind(&input.image_url)
            .bind(&input.status)
            .bind(&input.error_message)
            .bind(input.is_selected)
            .bind(&input.model_used)
            .fetch_one(pool)
            .await
    }

    /// Generations of a character, newest first.
    pub async fn list_for_character(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterVisualGeneration>, sqlx::Error> {
        let query = format!(
            "SELECT {CHARACTER_COLUMNS} FROM character_visual_generations \
             WHERE character_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CharacterVisualGeneration>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }
}

pub struct SeriesPosterGenerationRepo;

impl SeriesPosterGenerationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateSeriesPosterGeneration,
    ) -> Result<SeriesPosterGeneration, sqlx::Error> {
        let query = format!(
            "INSERT INTO series_poster_generations \
                (series_id, prompt, visual_style, image_url, status, error_message, \
                 is_selected, model_used) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {SERIES_COLUMNS}"
        );
        sqlx::query_as::<_, SeriesPosterGeneration>(&query)
            .bind(input.series_id)
            .bind(&input.prompt)
            .bind(&input.visual_style)
            .bind(&input.image_url)
            .bind(&input.status)
            .bind(&input.error_message)
            .bind(input.is_selected)
            .bind(&input.model_used)
            .fetch_one(pool)
            .await
    }

    /// Posters of a series, newest first.
    pub async fn list_for_series(
        pool: &PgPool,
        series_id: DbId,
    ) -> Result<Vec<SeriesPosterGeneration>, sqlx::Error> {
        let query = format!(
            "SELECT {SERIES_COLUMNS} FROM series_poster_generations \
             WHERE series_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, SeriesPosterGeneration>(&query)
            .bind(series_id)
            .fetch_all(pool)
            .await
    }
}
