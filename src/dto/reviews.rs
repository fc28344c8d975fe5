use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Review;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddReviewRequest {
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditReviewRequest {
    pub rating: i32,
    pub comment: String,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<Review>)]
    pub items: Vec<Review>,
}
