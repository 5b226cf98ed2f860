mod common;

use pretty_assertions::assert_eq;

use datamart_core::model::{
    CalcTypeDisplay, CubeUser, CubeUserAttributes, Cubeset, CubesetAttributes, CustomerUser,
    CustomerUserAttributes, DisplayOrder, FactColumn, FactColumnAttributes, FactColumnCalcType,
    RdlGroupFactColumn, Role, RoleAttributes,
};
use datamart_core::transport::Method;
use datamart_core::{DatamartError, KeyPart, ParentScoped, Record, RecordKey};

use common::demo_client;

fn child_ids<A: ParentScoped>(records: &[A]) -> Vec<String> {
    records.iter().map(|r| r.child_id().to_string()).collect()
}

#[tokio::test]
async fn duplicate_rejected_then_new_child_added() -> anyhow::Result<()> {
    let (client, transport) = demo_client();
    let mut members = client.associations::<CustomerUser>();

    let loaded = members.load_for_parent(&KeyPart::from("CUST1")).await?;
    assert_eq!(child_ids(loaded), vec!["USERA"]);

    let before = transport.calls();
    let err = members
        .add(&KeyPart::from("USERA"), CustomerUserAttributes::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DatamartError::DuplicateAssociation { .. }));
    assert_eq!(transport.calls(), before);
    assert_eq!(transport.count(Method::Post), 0);

    members
        .add(&KeyPart::from("USERB"), CustomerUserAttributes { role_id: Some(2) })
        .await?;

    let keys: Vec<RecordKey> = members.records().iter().map(Record::key).collect();
    assert_eq!(
        keys,
        vec![
            RecordKey::composite("CUST1", "USERA"),
            RecordKey::composite("CUST1", "USERB"),
        ]
    );
    // add is followed by a reload, never a local insert
    assert_eq!(transport.last().map(|r| r.method), Some(Method::Get));
    let added = &members.records()[1];
    assert_eq!(added.user_full_name.as_deref(), Some("Bob Baker"));
    assert_eq!(added.role_name.as_deref(), Some("Analyst"));
    Ok(())
}

#[tokio::test]
async fn blank_parent_loads_nothing() -> anyhow::Result<()> {
    let (client, transport) = demo_client();
    let mut members = client.associations::<CustomerUser>();

    assert!(members.load_for_parent(&KeyPart::from("")).await?.is_empty());
    let mut cube_users = client.associations::<CubeUser>();
    assert!(cube_users.load_for_parent(&KeyPart::Int(0)).await?.is_empty());
    assert_eq!(transport.calls(), 0);

    let err = members
        .add(&KeyPart::from("USERA"), CustomerUserAttributes::default())
        .await
        .unwrap_err();
    assert!(err.is_pre_dispatch());
    assert_eq!(transport.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn remove_reloads_from_server() -> anyhow::Result<()> {
    let (client, transport) = demo_client();
    let mut members = client.associations::<CustomerUser>();
    members.load_for_parent(&KeyPart::from("CUST1")).await?;

    members.remove(&KeyPart::from("USERA")).await?;
    assert!(members.records().is_empty());
    assert_eq!(transport.count(Method::Delete), 1);

    let err = members.remove(&KeyPart::from("USERA")).await.unwrap_err();
    assert!(matches!(err, DatamartError::NotFound { .. }));
    assert_eq!(transport.count(Method::Delete), 1);
    Ok(())
}

#[tokio::test]
async fn edit_uses_caller_token() -> anyhow::Result<()> {
    let (client, _) = demo_client();
    let mut members = client.associations::<CustomerUser>();
    members.load_for_parent(&KeyPart::from("CUST1")).await?;

    let child = KeyPart::from("USERA");
    let stale = members.set().require_child(&child)?.version.clone();

    members
        .edit(&child, CustomerUserAttributes { role_id: Some(2) }, stale.as_ref())
        .await?;
    let link = members.set().require_child(&child)?;
    assert_eq!(link.role_id, Some(2));
    assert_ne!(link.version, stale);

    let err = members
        .edit(&child, CustomerUserAttributes { role_id: None }, stale.as_ref())
        .await
        .unwrap_err();
    assert!(err.requires_reload());

    let err = members
        .edit(&child, CustomerUserAttributes { role_id: None }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DatamartError::MissingVersionToken { .. }));
    Ok(())
}

#[tokio::test]
async fn available_children_is_recomputed() -> anyhow::Result<()> {
    let (client, _) = demo_client();
    let mut members = client.associations::<CustomerUser>();
    members.load_for_parent(&KeyPart::from("CUST1")).await?;

    let candidates = || ["USERA", "USERB", "USERC"].map(KeyPart::from);
    assert_eq!(
        members.available_children(candidates()),
        vec![KeyPart::from("USERB"), KeyPart::from("USERC")]
    );

    members
        .add(&KeyPart::from("USERC"), CustomerUserAttributes::default())
        .await?;
    assert_eq!(
        members.available_children(candidates()),
        vec![KeyPart::from("USERB")]
    );
    Ok(())
}

#[tokio::test]
async fn integer_parents_and_simple_key_children() -> anyhow::Result<()> {
    let (client, _) = demo_client();

    let mut cube_users = client.associations::<CubeUser>();
    let loaded = cube_users.load_for_parent(&KeyPart::Int(1)).await?;
    assert_eq!(child_ids(loaded), vec!["USERA"]);
    cube_users
        .add(&KeyPart::from("USERB"), CubeUserAttributes::default())
        .await?;
    assert_eq!(cube_users.records().len(), 2);

    let mut roles = client.associations::<Role>();
    roles.load_for_parent(&KeyPart::from("CUST1")).await?;
    let err = roles
        .add(&KeyPart::from("Analyst"), RoleAttributes::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DatamartError::DuplicateAssociation { .. }));

    roles
        .add(
            &KeyPart::from("Auditor"),
            RoleAttributes {
                description: Some("Read-only access".to_string()),
            },
        )
        .await?;
    assert_eq!(
        child_ids(roles.records()),
        vec!["Administrator", "Analyst", "Auditor"]
    );
    Ok(())
}

#[tokio::test]
async fn calc_types_per_fact_column() -> anyhow::Result<()> {
    let (client, transport) = demo_client();
    let mut calcs = client.associations::<FactColumnCalcType>();

    let loaded = calcs.load_for_parent(&KeyPart::Int(1)).await?;
    assert_eq!(child_ids(loaded), vec!["SUM", "AVG"]);
    assert_eq!(loaded[0].calc_type_description.as_deref(), Some("Sum"));

    let err = calcs
        .add(&KeyPart::from("SUM"), CalcTypeDisplay::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DatamartError::DuplicateAssociation { .. }));
    assert_eq!(transport.count(Method::Post), 0);

    calcs
        .add(
            &KeyPart::from("RTOT"),
            CalcTypeDisplay {
                display_name: Some("Running".to_string()),
                is_visible: true,
            },
        )
        .await?;
    assert_eq!(child_ids(calcs.records()), vec!["SUM", "AVG", "RTOT"]);
    assert_eq!(
        calcs.records()[2].calc_type_description.as_deref(),
        Some("Running total")
    );

    let avg = KeyPart::from("AVG");
    let token = calcs.set().require_child(&avg)?.version.clone();
    calcs
        .edit(
            &avg,
            CalcTypeDisplay {
                display_name: None,
                is_visible: false,
            },
            token.as_ref(),
        )
        .await?;
    assert_eq!(
        transport.requests().iter().rev().nth(1).map(|r| r.path.clone()),
        Some("/factcolumncalctypes/1/AVG".to_string())
    );
    let hidden = calcs.set().require_child(&avg)?;
    assert!(!hidden.is_visible);

    calcs.remove(&KeyPart::from("SUM")).await?;
    assert_eq!(child_ids(calcs.records()), vec!["AVG", "RTOT"]);

    assert!(calcs.load_for_parent(&KeyPart::Int(2)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn report_group_columns_by_integer_keys() -> anyhow::Result<()> {
    let (client, transport) = demo_client();
    let mut columns = client.associations::<RdlGroupFactColumn>();

    let loaded = columns.load_for_parent(&KeyPart::Int(1)).await?;
    assert_eq!(child_ids(loaded), vec!["1"]);
    assert_eq!(loaded[0].column_name.as_deref(), Some("Amount"));

    let err = columns
        .add(&KeyPart::Int(1), DisplayOrder(4))
        .await
        .unwrap_err();
    assert!(matches!(err, DatamartError::DuplicateAssociation { .. }));

    let before = transport.calls();
    let err = columns
        .add(&KeyPart::Int(0), DisplayOrder(2))
        .await
        .unwrap_err();
    assert!(err.is_pre_dispatch());
    assert_eq!(transport.calls(), before);

    columns.add(&KeyPart::Int(3), DisplayOrder(2)).await?;
    assert_eq!(child_ids(columns.records()), vec!["1", "3"]);
    assert_eq!(columns.records()[1].column_name.as_deref(), Some("Channel"));

    let first = KeyPart::Int(1);
    let token = columns.set().require_child(&first)?.version.clone();
    columns.edit(&first, DisplayOrder(5), token.as_ref()).await?;
    assert_eq!(columns.set().require_child(&first)?.display_order, 5);

    columns.remove(&first).await?;
    assert_eq!(child_ids(columns.records()), vec!["3"]);
    Ok(())
}

#[tokio::test]
async fn fact_columns_and_cubesets_keyed_by_name() -> anyhow::Result<()> {
    let (client, _) = demo_client();

    let mut fact_columns = client.associations::<FactColumn>();
    let loaded = fact_columns.load_for_parent(&KeyPart::Int(1)).await?;
    assert_eq!(child_ids(loaded), vec!["Amount", "Quantity", "Channel"]);
    assert_eq!(loaded[0].fact_name.as_deref(), Some("Sales"));

    let region = FactColumnAttributes {
        data_type: "varchar".to_string(),
        is_measure: false,
        format_string: None,
    };
    let err = fact_columns
        .add(&KeyPart::from("Amount"), region.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, DatamartError::DuplicateAssociation { .. }));

    fact_columns.add(&KeyPart::from("Region"), region).await?;
    let added = fact_columns.set().require_child(&KeyPart::from("Region"))?;
    assert_eq!(added.fact_column_id, 4);

    fact_columns.remove(&KeyPart::from("Channel")).await?;
    assert_eq!(
        child_ids(fact_columns.records()),
        vec!["Amount", "Quantity", "Region"]
    );

    let mut cubesets = client.associations::<Cubeset>();
    cubesets.load_for_parent(&KeyPart::from("CUST1")).await?;
    cubesets
        .add(&KeyPart::from("Wholesale"), CubesetAttributes::default())
        .await?;
    assert_eq!(child_ids(cubesets.records()), vec!["Retail", "Wholesale"]);
    assert_eq!(
        cubesets.records()[1].customer_name.as_deref(),
        Some("Acme Retail")
    );
    Ok(())
}
