use reqwest::StatusCode;
use serde_json::{json, Value};

fn api_url(path: &str) -> String {
    let base = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    format!("{}/api{}", base, path)
}

async fn create_dish(client: &reqwest::Client, name: &str) -> Value {
    let response = client
        .post(api_url("/dishes"))
        .json(&json!({
            "name": name,
            "price": 8.0,
            "category": "Comida"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    response.json::<Value>().await.unwrap()
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn purchase_requires_an_existing_dish() {
    let client = reqwest::Client::new();

    let response = client
        .post(api_url("/purchases"))
        .json(&json!({
            "dish_id": "00000000000000000000000000",
            "user_id": "user-1"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn purchase_of_an_existing_dish_is_recorded() {
    let client = reqwest::Client::new();

    let dish = create_dish(&client, "Croquetas").await;
    let dish_id = dish["id"].as_str().unwrap();

    let response = client
        .post(api_url("/purchases"))
        .json(&json!({
            "dish_id": dish_id,
            "user_id": "user-1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let purchase = response.json::<Value>().await.unwrap();
    assert_eq!(purchase["dish_id"], json!(dish_id));

    let response = client
        .get(api_url(&format!(
            "/purchases/{}",
            purchase["id"].as_str().unwrap()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn deleting_a_dish_removes_its_purchases() {
    let client = reqwest::Client::new();

    let dish = create_dish(&client, "Salmorejo").await;
    let dish_id = dish["id"].as_str().unwrap();

    let response = client
        .post(api_url("/purchases"))
        .json(&json!({
            "dish_id": dish_id,
            "user_id": "user-2"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .delete(api_url(&format!("/dishes/{}", dish_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let purchases = client
        .get(api_url(&format!("/purchases?dish_id={}", dish_id)))
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap();
    assert!(purchases.is_empty());
}
