use pretty_assertions::assert_eq;
use tokio::net::TcpListener;

use datamart_client::DatamartClient;
use datamart_core::config::ClientConfig;
use datamart_core::filter::ListFilter;
use datamart_core::model::{Customer, CustomerUser, CustomerUserAttributes};
use datamart_core::{DatamartError, KeyPart, RecordKey};
use datamart_stub::{StubBackend, StubConfig};

async fn spawn_backend() -> anyhow::Result<DatamartClient> {
    let backend = StubBackend::demo(StubConfig::default())?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(datamart_stub::server::serve_listener(
        listener,
        backend.router(),
    ));

    let config = ClientConfig {
        base_url: format!("http://{}", addr),
        ..ClientConfig::default()
    };
    Ok(DatamartClient::connect(config))
}

#[tokio::test]
async fn crud_over_http() -> anyhow::Result<()> {
    let client = spawn_backend().await?;
    let customers = client.repository::<Customer>();

    let page = customers.list(&ListFilter::new().page(1).page_size(1)).await?;
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.page_info.map(|p| p.total_items), Some(2));

    let key = RecordKey::simple("CUST2");
    let mut record = customers.get_by_id(&key).await?;
    let token = record.version.clone();
    record.customer_name = "Globex West".to_string();
    customers.update(&key, &record, token.as_ref()).await?;

    let err = customers
        .update(&key, &record, token.as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, DatamartError::Concurrency { .. }));

    customers.delete_by_id(&key).await?;
    assert!(matches!(
        customers.get_by_id(&key).await.unwrap_err(),
        DatamartError::NotFound { .. }
    ));
    Ok(())
}

#[tokio::test]
async fn associations_over_http() -> anyhow::Result<()> {
    let client = spawn_backend().await?;
    let mut members = client.associations::<CustomerUser>();
    members.load_for_parent(&KeyPart::from("CUST1")).await?;

    members
        .add(&KeyPart::from("USERC"), CustomerUserAttributes { role_id: Some(1) })
        .await?;
    assert_eq!(members.records().len(), 2);

    members.remove(&KeyPart::from("USERA")).await?;
    let remaining: Vec<&str> = members
        .records()
        .iter()
        .map(|m| m.user_id.as_str())
        .collect();
    assert_eq!(remaining, vec!["USERC"]);
    Ok(())
}
