//! Demo data for local development.

use datamart_core::model::{
    CalcType, Cube, CubeUser, Cubeset, Customer, CustomerUser, Fact, FactColumn,
    FactColumnCalcType, RdlGroup, RdlGroupFactColumn, Role, User,
};
use datamart_core::Record;

use crate::store::{MemoryStore, StoreError};

fn put<R: Record>(store: &MemoryStore, record: R) -> Result<(), StoreError> {
    let body =
        serde_json::to_value(&record).map_err(|e| StoreError::InvalidBody(e.to_string()))?;
    store.insert(R::COLLECTION, body)?;
    Ok(())
}

fn user(id: &str, customer: &str, first: &str, last: &str) -> User {
    User {
        user_id: id.to_string(),
        customer_id: customer.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: Some(format!("{}@example.com", id.to_ascii_lowercase())),
        is_active: true,
        version: None,
    }
}

/// Loads two customers with users, roles, a cube, one fact and a report group.
pub fn load_demo(store: &MemoryStore) -> Result<(), StoreError> {
    put(store, Customer::new("CUST1", "Acme Retail"))?;
    put(store, Customer::new("CUST2", "Globex Logistics"))?;

    for (id, first, last) in [
        ("USERA", "Ann", "Archer"),
        ("USERB", "Bob", "Baker"),
        ("USERC", "Cid", "Cole"),
    ] {
        put(store, user(id, "CUST1", first, last))?;
    }
    put(store, user("USERD", "CUST2", "Dee", "Dunn"))?;

    for name in ["Administrator", "Analyst"] {
        put(
            store,
            Role {
                role_id: 0,
                customer_id: "CUST1".to_string(),
                role_name: name.to_string(),
                description: None,
                customer_name: None,
                version: None,
            },
        )?;
    }

    put(
        store,
        CustomerUser {
            customer_id: "CUST1".to_string(),
            user_id: "USERA".to_string(),
            role_id: Some(1),
            user_full_name: None,
            role_name: None,
            version: None,
        },
    )?;

    put(
        store,
        Cube {
            cube_id: 0,
            customer_id: "CUST1".to_string(),
            cube_name: "Sales".to_string(),
            database_name: Some("acme_sales".to_string()),
            description: None,
            customer_name: None,
            version: None,
        },
    )?;
    put(
        store,
        Cubeset {
            cubeset_id: 0,
            customer_id: "CUST1".to_string(),
            cubeset_name: "Retail".to_string(),
            description: Some("Store and online sales".to_string()),
            customer_name: None,
            version: None,
        },
    )?;
    put(
        store,
        CubeUser {
            cube_id: 1,
            user_id: "USERA".to_string(),
            role_id: Some(2),
            user_full_name: None,
            cube_name: None,
            version: None,
        },
    )?;

    put(
        store,
        Fact {
            fact_id: 0,
            cube_id: 1,
            fact_name: "Sales".to_string(),
            table_name: "fact_sales".to_string(),
            description: None,
            version: None,
        },
    )?;
    for (column, measure) in [("Amount", true), ("Quantity", true), ("Channel", false)] {
        put(
            store,
            FactColumn {
                fact_column_id: 0,
                fact_id: 1,
                column_name: column.to_string(),
                data_type: if measure { "decimal" } else { "varchar" }.to_string(),
                is_measure: measure,
                format_string: None,
                fact_name: None,
                version: None,
            },
        )?;
    }

    for (code, description) in [
        ("SUM", "Sum"),
        ("AVG", "Average"),
        ("RTOT", "Running total"),
    ] {
        put(
            store,
            CalcType {
                calc_type_code: code.to_string(),
                description: description.to_string(),
                version: None,
            },
        )?;
    }

    for (code, name) in [("SUM", "Total amount"), ("AVG", "Average amount")] {
        put(
            store,
            FactColumnCalcType {
                fact_column_id: 1,
                calc_type_code: code.to_string(),
                display_name: Some(name.to_string()),
                is_visible: true,
                calc_type_description: None,
                version: None,
            },
        )?;
    }

    put(
        store,
        RdlGroup {
            rdl_group_id: 0,
            group_name: "Executive".to_string(),
            description: Some("Monthly board pack".to_string()),
            version: None,
        },
    )?;
    put(
        store,
        RdlGroupFactColumn {
            rdl_group_id: 1,
            fact_column_id: 1,
            display_order: 1,
            column_name: None,
            version: None,
        },
    )?;

    tracing::info!("demo data loaded");
    Ok(())
}
