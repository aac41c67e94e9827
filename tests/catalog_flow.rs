use std::sync::Arc;

use pim_catalog::api::{create_router, AppState};
use pim_catalog::logic::{AllowAll, LogSink};
use pim_catalog::model::LocaleSettings;
use pim_catalog::store::MemoryStore;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
            .expect("post request failed")
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Response {
        self.client
            .put(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
            .expect("put request failed")
    }

    async fn patch(&self, path: &str, json: Value) -> reqwest::Response {
        self.client
            .patch(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
            .expect("patch request failed")
    }

    async fn get_json(&self, path: &str) -> Value {
        let response = self
            .client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("get request failed");
        assert!(response.status().is_success(), "GET {} failed", path);
        response.json().await.expect("invalid json body")
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(&format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("delete request failed")
    }
}

// Serve the API on an ephemeral port, backed by the in-memory store.
async fn spawn_server() -> TestClient {
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        acl: Arc::new(AllowAll),
        events: Arc::new(LogSink),
        locales: LocaleSettings::new(&["de_DE"]),
    };
    let app = create_router().with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestClient::new(format!("http://{}", addr))
}

async fn create_attribute(client: &TestClient, body: Value) -> String {
    let response = client.post("/attributes", body).await;
    assert_eq!(response.status(), 201);
    let attribute: Value = response.json().await.unwrap();
    attribute["id"].as_str().unwrap().to_string()
}

async fn create_family(client: &TestClient, name: &str) -> String {
    let response = client.post("/families", json!({ "name": name })).await;
    assert_eq!(response.status(), 201);
    let family: Value = response.json().await.unwrap();
    family["id"].as_str().unwrap().to_string()
}

async fn create_product(client: &TestClient, name: &str, family_id: Option<&str>) -> String {
    let mut body = json!({ "name": name });
    if let Some(family_id) = family_id {
        body["productFamilyId"] = json!(family_id);
    }
    let response = client.post("/products", body).await;
    assert_eq!(response.status(), 201);
    let product: Value = response.json().await.unwrap();
    product["id"].as_str().unwrap().to_string()
}

fn record_for<'v>(records: &'v [Value], attribute_id: &str) -> Option<&'v Value> {
    records
        .iter()
        .find(|r| r["attributeId"].as_str() == Some(attribute_id))
}

#[tokio::test]
async fn family_link_lifecycle_preserves_values() {
    let client = spawn_server().await;

    let color = create_attribute(
        &client,
        json!({
            "name": "Color",
            "type": "enum",
            "sortOrder": 10,
            "typeValue": ["Red", "Green", "Blue"]
        }),
    )
    .await;
    let material = create_attribute(
        &client,
        json!({ "name": "Material", "type": "string", "sortOrder": 20 }),
    )
    .await;
    let weight = create_attribute(
        &client,
        json!({ "name": "Weight", "type": "float", "sortOrder": 30 }),
    )
    .await;

    let family_one = create_family(&client, "Family One").await;
    let family_two = create_family(&client, "Family Two").await;

    for attribute_id in [&color, &material] {
        let response = client
            .post(
                &format!("/families/{}/attributes/{}", family_one, attribute_id),
                json!({ "isRequired": false }),
            )
            .await;
        assert_eq!(response.status(), 204);
    }
    for attribute_id in [&color, &weight] {
        let response = client
            .post(
                &format!("/families/{}/attributes/{}", family_two, attribute_id),
                json!({}),
            )
            .await;
        assert_eq!(response.status(), 204);
    }

    // a product of family one materializes both linked attributes
    let product = create_product(&client, "Widget", Some(&family_one)).await;
    let records: Vec<Value> = client
        .get_json(&format!("/products/{}/attributes", product))
        .await
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(records.len(), 2);
    assert!(record_for(&records, &color).is_some());
    assert!(record_for(&records, &material).is_some());

    // write a value so we can observe it surviving the family change
    let response = client
        .put(
            &format!("/products/{}/attributes", product),
            json!([{ "attributeId": color, "value": "Green" }]),
        )
        .await;
    assert_eq!(response.status(), 204);

    // unlink material: its instance disappears
    let response = client
        .delete(&format!("/families/{}/attributes/{}", family_one, material))
        .await;
    assert_eq!(response.status(), 204);
    let records: Vec<Value> = client
        .get_json(&format!("/products/{}/attributes", product))
        .await
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["attributeId"], json!(color));

    // reassign to family two: the color value is preserved, weight appears
    let response = client
        .patch(
            &format!("/products/{}/family", product),
            json!({ "productFamilyId": family_two }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let records: Vec<Value> = client
        .get_json(&format!("/products/{}/attributes", product))
        .await
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(records.len(), 2);
    let color_record = record_for(&records, &color).unwrap();
    assert_eq!(color_record["value"], json!("Green"));
    assert!(record_for(&records, &weight).is_some());

    // dropping the family entirely removes family-owned instances
    let response = client
        .patch(
            &format!("/products/{}/family", product),
            json!({ "productFamilyId": null }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let records = client
        .get_json(&format!("/products/{}/attributes", product))
        .await;
    assert_eq!(records.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn relinking_is_idempotent_and_resets_after_unlink() {
    let client = spawn_server().await;
    let size = create_attribute(&client, json!({ "name": "Size", "type": "string" })).await;
    let family = create_family(&client, "Shoes").await;
    let product = create_product(&client, "Sneaker", Some(&family)).await;

    // linking twice while active keeps the one existing instance
    for _ in 0..2 {
        let response = client
            .post(
                &format!("/families/{}/attributes/{}", family, size),
                json!({}),
            )
            .await;
        assert_eq!(response.status(), 204);
    }

    let response = client
        .put(
            &format!("/products/{}/attributes", product),
            json!([{ "attributeId": size, "value": "44" }]),
        )
        .await;
    assert_eq!(response.status(), 204);

    let records = client
        .get_json(&format!("/products/{}/attributes", product))
        .await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    let original_instance_id = records[0]["productAttributeValueId"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(records[0]["value"], json!("44"));

    // unlink then relink materializes a fresh, default-valued instance
    let response = client
        .delete(&format!("/families/{}/attributes/{}", family, size))
        .await;
    assert_eq!(response.status(), 204);
    let response = client
        .post(
            &format!("/families/{}/attributes/{}", family, size),
            json!({}),
        )
        .await;
    assert_eq!(response.status(), 204);

    let records = client
        .get_json(&format!("/products/{}/attributes", product))
        .await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_ne!(
        records[0]["productAttributeValueId"].as_str().unwrap(),
        original_instance_id
    );
    assert_eq!(records[0]["value"], json!(null));
}

#[tokio::test]
async fn typed_values_round_trip_through_updates() {
    let client = spawn_server().await;
    let stock = create_attribute(&client, json!({ "name": "In Stock", "type": "bool" })).await;
    let tags = create_attribute(&client, json!({ "name": "Tags", "type": "array" })).await;
    let family = create_family(&client, "Gadgets").await;
    for attribute_id in [&stock, &tags] {
        client
            .post(
                &format!("/families/{}/attributes/{}", family, attribute_id),
                json!({}),
            )
            .await;
    }
    let product = create_product(&client, "Gizmo", Some(&family)).await;

    let response = client
        .put(
            &format!("/products/{}/attributes", product),
            json!([
                { "attributeId": stock, "value": true },
                { "attributeId": tags, "value": ["a", "b"] }
            ]),
        )
        .await;
    assert_eq!(response.status(), 204);

    let records: Vec<Value> = client
        .get_json(&format!("/products/{}/attributes", product))
        .await
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(record_for(&records, &stock).unwrap()["value"], json!(true));
    assert_eq!(
        record_for(&records, &tags).unwrap()["value"],
        json!(["a", "b"])
    );

    // a row with no attribute id rejects the whole batch
    let response = client
        .put(
            &format!("/products/{}/attributes", product),
            json!([{ "value": "x" }]),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn associations_mirror_and_unmirror() {
    let client = spawn_server().await;
    let main = create_product(&client, "Main", None).await;
    let related = create_product(&client, "Related", None).await;

    let response = client
        .post("/associations", json!({ "name": "Cross-sell" }))
        .await;
    let forward: Value = response.json().await.unwrap();
    let forward_id = forward["id"].as_str().unwrap().to_string();

    let response = client
        .post("/associations", json!({ "name": "Cross-sell (back)" }))
        .await;
    let backward: Value = response.json().await.unwrap();
    let backward_id = backward["id"].as_str().unwrap().to_string();

    // rebuild the forward association with its backward pointer
    let response = client
        .post(
            "/associations",
            json!({ "name": "Cross-sell", "backwardAssociationId": backward_id }),
        )
        .await;
    let forward: Value = response.json().await.unwrap();
    let forward_id_linked = forward["id"].as_str().unwrap().to_string();
    assert_ne!(forward_id, forward_id_linked);

    let response = client
        .post(
            &format!("/associations/{}/add-related", forward_id_linked),
            json!({ "mainProductIds": [main], "relatedProductIds": [related] }),
        )
        .await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["affected"], json!(1));

    // re-adding the same pair creates nothing
    let response = client
        .post(
            &format!("/associations/{}/add-related", forward_id_linked),
            json!({ "mainProductIds": [main], "relatedProductIds": [related] }),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["affected"], json!(0));

    let response = client
        .post(
            &format!("/associations/{}/remove-related", forward_id_linked),
            json!({ "mainProductIds": [main], "relatedProductIds": [related] }),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["affected"], json!(1));
}

#[tokio::test]
async fn channel_groups_come_back_even_when_empty() {
    let client = spawn_server().await;
    let color = create_attribute(&client, json!({ "name": "Color", "type": "string" })).await;
    let family = create_family(&client, "Apparel").await;
    client
        .post(
            &format!("/families/{}/attributes/{}", family, color),
            json!({}),
        )
        .await;
    let product = create_product(&client, "Shirt", Some(&family)).await;

    let response = client
        .post("/channels", json!({ "name": "Web", "locales": ["de_DE"] }))
        .await;
    let channel: Value = response.json().await.unwrap();
    let channel_id = channel["id"].as_str().unwrap().to_string();

    let groups: Vec<Value> = client
        .get_json(&format!("/products/{}/channel-attributes", product))
        .await
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["channelId"], json!(channel_id));
    assert_eq!(groups[0]["attributes"].as_array().unwrap().len(), 0);

    let response = client
        .put(
            &format!(
                "/products/{}/channels/{}/attributes/{}",
                product, channel_id, color
            ),
            json!({ "value": "Navy" }),
        )
        .await;
    assert_eq!(response.status(), 204);

    let groups: Vec<Value> = client
        .get_json(&format!("/products/{}/channel-attributes", product))
        .await
        .as_array()
        .unwrap()
        .clone();
    let attributes = groups[0]["attributes"].as_array().unwrap();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0]["attributeValue"], json!("Navy"));
}

#[tokio::test]
async fn attribute_group_resequencing() {
    let client = spawn_server().await;
    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let id = create_attribute(
            &client,
            json!({
                "name": name,
                "type": "string",
                "attributeGroupId": "g1",
                "attributeGroupName": "General",
                "attributeGroupOrder": 1
            }),
        )
        .await;
        ids.push(id);
    }

    let reordered = vec![ids[2].clone(), ids[0].clone(), ids[1].clone()];
    let response = client
        .put(
            "/attribute-groups/g1/order",
            json!({ "attributeIds": reordered }),
        )
        .await;
    assert_eq!(response.status(), 204);

    let body = client.get_json("/attributes").await;
    let listed: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![&ids[2], &ids[0], &ids[1]]);
}
