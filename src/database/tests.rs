use std::ops::Add;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{CartItem, Category, Payment, Product, Role, User};

use super::{AppState, DatabaseConnection, ProductQuery, ProductSort};

async fn connect(pool: PgPool) -> DatabaseConnection {
    let _ = env_logger::builder().is_test(true).try_init();

    let app_state = AppState::from_pool(pool).await;
    DatabaseConnection {
        connection: app_state.pool.acquire().await.unwrap(),
    }
}

fn new_user(role: Role, username: &str, email: &str) -> User {
    User {
        id: 0,
        uuid: Uuid::new_v4().to_string(),
        role,
        username: username.to_string(),
        password_hash: vec![13u8; 32],
        email: email.to_string(),
        is_disabled: false,
        otp: None,
    }
}

/// Admin, cashier, one category and two products (1500 and 700).
async fn seed_catalog(db: &mut DatabaseConnection) -> (User, User, Category, Product, Product) {
    let admin = db
        .store_user(new_user(Role::Admin, "admin", "admin@example.org"))
        .await
        .unwrap();
    let cashier = db
        .store_user(new_user(Role::Cashier, "cashier", "cashier@example.org"))
        .await
        .unwrap();

    let category = db
        .store_category(Category {
            id: 0,
            name: "Drinks".to_string(),
            owner_id: admin.id,
            is_deleted: false,
        })
        .await
        .unwrap();

    let coffee = db
        .store_product(Product {
            id: 0,
            name: "Coffee".to_string(),
            price: 1500,
            description: Some("Freshly brewed".to_string()),
            category_id: category.id,
            owner_id: admin.id,
            is_deactivated: false,
        })
        .await
        .unwrap();
    let tea = db
        .store_product(Product {
            id: 0,
            name: "Tea".to_string(),
            price: 700,
            description: Some("Loose leaf".to_string()),
            category_id: category.id,
            owner_id: admin.id,
            is_deactivated: false,
        })
        .await
        .unwrap();

    (admin, cashier, category, coffee, tea)
}

#[sqlx::test]
async fn test_session_crud(pool: PgPool) {
    let mut db = connect(pool).await;

    let user = db
        .store_user(new_user(Role::Cashier, "johndoe", "john.doe@example.org"))
        .await
        .unwrap();
    assert!(user.id != 0);

    let token = db
        .create_session_token(user.id, Utc::now().add(Duration::hours(24)))
        .await
        .unwrap();
    let session = db
        .get_session_by_session_token(token.clone())
        .await
        .unwrap();
    let session = session.expect("there is a session for the token");

    assert_eq!(session.user, user);
    assert_eq!(session.token, token);
    assert!(session.valid_until > Utc::now());

    db.delete_session_token(token.clone()).await.unwrap();
    assert_eq!(db.get_session_by_session_token(token).await.unwrap(), None);

    // expired tokens are never resolved
    let expired = db
        .create_session_token(user.id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(db.get_session_by_session_token(expired).await.unwrap(), None);
}

#[sqlx::test]
async fn test_user_crud(pool: PgPool) {
    let mut db = connect(pool).await;

    let _admin = db
        .store_user(new_user(Role::Admin, "admin", "admin@example.org"))
        .await
        .unwrap();
    let cashier = db
        .store_user(new_user(Role::Cashier, "johndoe", "john.doe@example.org"))
        .await
        .unwrap();

    assert_eq!(
        db.get_user_by_id(cashier.id).await.unwrap(),
        Some(cashier.clone())
    );
    assert_eq!(
        db.get_user_by_uuid(&cashier.uuid).await.unwrap(),
        Some(cashier.clone())
    );
    assert_eq!(
        db.get_user_by_username("johndoe").await.unwrap(),
        Some(cashier.clone())
    );
    assert_eq!(
        db.get_user_by_email("john.doe@example.org").await.unwrap(),
        Some(cashier.clone())
    );
    assert_eq!(db.get_user_by_id(123213).await.unwrap(), None);

    // the duplicate check matches username and email together
    assert_eq!(
        db.get_user_by_username_and_email("johndoe", "john.doe@example.org")
            .await
            .unwrap(),
        Some(cashier.clone())
    );
    assert_eq!(
        db.get_user_by_username_and_email("johndoe", "other@example.org")
            .await
            .unwrap(),
        None
    );

    // cashier listings are split by the disable flag, admins never appear
    assert_eq!(db.get_cashiers(false).await.unwrap(), vec![cashier.clone()]);
    assert_eq!(db.get_cashiers(true).await.unwrap(), vec![]);

    let mut disabled = cashier.clone();
    disabled.is_disabled = true;
    let disabled = db.store_user(disabled).await.unwrap();
    assert_eq!(db.get_cashiers(false).await.unwrap(), vec![]);
    assert_eq!(db.get_cashiers(true).await.unwrap(), vec![disabled]);
}

#[sqlx::test]
async fn test_category_crud(pool: PgPool) {
    let mut db = connect(pool).await;

    let admin = db
        .store_user(new_user(Role::Admin, "admin", "admin@example.org"))
        .await
        .unwrap();

    let drinks = db
        .store_category(Category {
            id: 0,
            name: "Drinks".to_string(),
            owner_id: admin.id,
            is_deleted: false,
        })
        .await
        .unwrap();
    assert!(drinks.id != 0);

    assert_eq!(
        db.get_category_by_name("Drinks").await.unwrap(),
        Some(drinks.clone())
    );
    assert_eq!(db.get_category_by_name("Snacks").await.unwrap(), None);

    assert_eq!(db.get_all_categories().await.unwrap(), vec![drinks.clone()]);

    // soft deleted categories disappear from all lookups
    let mut deleted = drinks.clone();
    deleted.is_deleted = true;
    db.store_category(deleted).await.unwrap();

    assert_eq!(db.get_all_categories().await.unwrap(), vec![]);
    assert_eq!(db.get_category_by_id(drinks.id).await.unwrap(), None);
    assert_eq!(db.get_category_by_name("Drinks").await.unwrap(), None);
}

#[sqlx::test]
async fn test_product_listing(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, _cashier, category, coffee, tea) = seed_catalog(&mut db).await;

    let all = ProductQuery {
        category_id: None,
        search: None,
        sort: ProductSort::NameAsc,
        page: 1,
    };

    let page = db.get_products(&all).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.page, 1);
    let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Coffee", "Tea"]);
    assert_eq!(page.products[0].category, category);

    let by_price_desc = db
        .get_products(&ProductQuery {
            sort: ProductSort::PriceDesc,
            ..all.clone()
        })
        .await
        .unwrap();
    let prices: Vec<_> = by_price_desc.products.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![1500, 700]);

    let searched = db
        .get_products(&ProductQuery {
            search: Some("cof".to_string()),
            ..all.clone()
        })
        .await
        .unwrap();
    assert_eq!(searched.total, 1);
    assert_eq!(searched.products[0].id, coffee.id);

    // deactivated products disappear from the listing
    let mut deactivated = tea.clone();
    deactivated.is_deactivated = true;
    db.store_product(deactivated).await.unwrap();

    let page = db.get_products(&all).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.products[0].id, coffee.id);

    // pages past the end are empty but keep the total
    let page = db
        .get_products(&ProductQuery { page: 3, ..all })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(page.products.is_empty());
}

#[sqlx::test]
async fn test_product_image(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, _cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    assert_eq!(db.get_product_image(coffee.id).await.unwrap(), None);

    let image = crate::models::Image {
        data: vec![137, 80, 78, 71, 13, 10, 26, 10],
        mimetype: "image/png".to_string(),
    };
    db.store_product_image(coffee.id, image.clone())
        .await
        .unwrap();
    assert_eq!(
        db.get_product_image(coffee.id).await.unwrap(),
        Some(image)
    );

    db.delete_product_image(coffee.id).await.unwrap();
    assert_eq!(db.get_product_image(coffee.id).await.unwrap(), None);
}

#[sqlx::test]
async fn test_create_transaction_totals(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, tea) = seed_catalog(&mut db).await;

    // a cart of two coffees totals 3000 with a single line
    let transaction = db
        .create_transaction(
            cashier.id,
            &[CartItem {
                product_id: coffee.id,
                qty: 2,
            }],
        )
        .await
        .unwrap();

    assert_eq!(transaction.user_id, cashier.id);
    assert_eq!(transaction.total, 3000);
    assert_eq!(transaction.items.len(), 1);
    assert_eq!(transaction.items[0].product_id, coffee.id);
    assert_eq!(transaction.items[0].qty, 2);
    assert_eq!(transaction.items[0].subtotal, 3000);

    // one line per cart entry, total is the sum of the subtotals
    let transaction = db
        .create_transaction(
            cashier.id,
            &[
                CartItem {
                    product_id: coffee.id,
                    qty: 1,
                },
                CartItem {
                    product_id: tea.id,
                    qty: 3,
                },
            ],
        )
        .await
        .unwrap();

    assert_eq!(transaction.items.len(), 2);
    assert_eq!(transaction.total, 1500 + 3 * 700);
    assert_eq!(
        transaction.total,
        transaction.items.iter().map(|i| i.subtotal).sum::<i64>()
    );

    // the stored header matches what was returned at creation
    let fetched = db
        .get_transaction_by_id(transaction.id)
        .await
        .unwrap()
        .expect("transaction was stored");
    assert_eq!(fetched, transaction);
}

#[sqlx::test]
async fn test_create_transaction_unknown_product_rolls_back(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    let result = db
        .create_transaction(
            cashier.id,
            &[
                CartItem {
                    product_id: coffee.id,
                    qty: 1,
                },
                CartItem {
                    product_id: 999,
                    qty: 1,
                },
            ],
        )
        .await;

    match result {
        Err(ServiceError::NotFound(message)) => {
            assert_eq!(message, "Product with ID 999 not found.");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    // neither the header nor any line survived the rollback
    assert_eq!(db.get_transactions().await.unwrap(), vec![]);
}

#[sqlx::test]
async fn test_create_transaction_rejects_invalid_carts(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    let empty = db.create_transaction(cashier.id, &[]).await;
    assert!(matches!(empty, Err(ServiceError::BadRequest(_))));

    for qty in [0, -2] {
        let result = db
            .create_transaction(
                cashier.id,
                &[CartItem {
                    product_id: coffee.id,
                    qty,
                }],
            )
            .await;
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    assert_eq!(db.get_transactions().await.unwrap(), vec![]);
}

#[sqlx::test]
async fn test_deactivated_product_cannot_be_sold(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    let mut deactivated = coffee.clone();
    deactivated.is_deactivated = true;
    db.store_product(deactivated).await.unwrap();

    let result = db
        .create_transaction(
            cashier.id,
            &[CartItem {
                product_id: coffee.id,
                qty: 1,
            }],
        )
        .await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
    assert_eq!(db.get_transactions().await.unwrap(), vec![]);
}

#[sqlx::test]
async fn test_payment_change(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    let transaction = db
        .create_transaction(
            cashier.id,
            &[CartItem {
                product_id: coffee.id,
                qty: 2,
            }],
        )
        .await
        .unwrap();
    assert_eq!(transaction.total, 3000);

    let payment = db
        .store_payment(Payment {
            id: 0,
            transaction_id: transaction.id,
            payment_amount: 5000,
            change: crate::checkout::change_due(transaction.total, 5000),
        })
        .await
        .unwrap();

    assert_eq!(payment.transaction_id, transaction.id);
    assert_eq!(payment.payment_amount, 5000);
    assert_eq!(payment.change, 2000);

    assert_eq!(
        db.get_payment_by_transaction_id(transaction.id)
            .await
            .unwrap(),
        Some(payment)
    );
}

#[sqlx::test]
async fn test_payment_under_tender_records_negative_change(pool: PgPool) {
    // Current policy: under-tendered payments are accepted and the change
    // goes negative. The strict alternative lives behind REQUIRE_FULL_TENDER
    // at the api boundary.
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    let transaction = db
        .create_transaction(
            cashier.id,
            &[CartItem {
                product_id: coffee.id,
                qty: 2,
            }],
        )
        .await
        .unwrap();

    let payment = db
        .store_payment(Payment {
            id: 0,
            transaction_id: transaction.id,
            payment_amount: 2000,
            change: crate::checkout::change_due(transaction.total, 2000),
        })
        .await
        .unwrap();

    assert_eq!(payment.change, -1000);
}

#[sqlx::test]
async fn test_duplicate_payment_conflicts(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    let transaction = db
        .create_transaction(
            cashier.id,
            &[CartItem {
                product_id: coffee.id,
                qty: 1,
            }],
        )
        .await
        .unwrap();

    let first = db
        .store_payment(Payment {
            id: 0,
            transaction_id: transaction.id,
            payment_amount: 2000,
            change: 500,
        })
        .await
        .unwrap();

    let second = db
        .store_payment(Payment {
            id: 0,
            transaction_id: transaction.id,
            payment_amount: 2000,
            change: 500,
        })
        .await;
    assert!(matches!(second, Err(ServiceError::Conflict(_))));

    // only the first payment survived
    assert_eq!(
        db.get_payment_by_transaction_id(transaction.id)
            .await
            .unwrap(),
        Some(first)
    );
}

#[sqlx::test]
async fn test_transaction_total_is_not_recomputed(pool: PgPool) {
    let mut db = connect(pool).await;
    let (_admin, cashier, _category, coffee, _tea) = seed_catalog(&mut db).await;

    let transaction = db
        .create_transaction(
            cashier.id,
            &[CartItem {
                product_id: coffee.id,
                qty: 2,
            }],
        )
        .await
        .unwrap();
    assert_eq!(transaction.total, 3000);

    // a later price change never touches recorded totals
    let mut repriced = coffee.clone();
    repriced.price = 9999;
    db.store_product(repriced).await.unwrap();

    let fetched = db
        .get_transaction_by_id(transaction.id)
        .await
        .unwrap()
        .expect("transaction was stored");
    assert_eq!(fetched.total, 3000);
    assert_eq!(fetched.items[0].subtotal, 3000);
}
