mod common;

#[cfg(feature = "http")]
#[cfg(test)]
mod test_network {
    use super::common::*;
    use akash_devkit::broadcast::*;
    use akash_devkit::client::AkashClient;
    use akash_devkit::messages::{
        BidId, DeploymentSpec, GroupSpec, MessageBuilder, OrderId, PlacementRequirements,
        ResourceSpec,
    };
    use akash_devkit::network::*;
    use akash_devkit::transactions::{SignedTransaction, TransactionAssembler, TransactionInfo};
    use akash_devkit::coin::{AmountError, Coin};
    use akash_devkit::{
        AccountAddress, Error, NetworkConfig, SigningError, TransactionBuilder,
        TransactionBuilderError, Wallet,
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::Value;
    use std::time::Duration;

    const CHAIN_ID: &str = "akashnet-2";

    fn config(url: &str) -> NetworkConfig {
        NetworkConfig::custom(CHAIN_ID, url)
            .with_rpc_url(url)
            .with_timeout(Duration::from_secs(5))
    }

    fn spec() -> DeploymentSpec {
        DeploymentSpec {
            groups: vec![GroupSpec {
                name: "akash".to_string(),
                requirements: PlacementRequirements::default(),
                resources: vec![ResourceSpec {
                    cpu_millis: 100,
                    memory_bytes: 134_217_728,
                    storage: vec![],
                    count: 1,
                    price: "100uakt".to_string(),
                }],
            }],
        }
    }

    /// Node answering account queries with `{5, 2}` and broadcasts with `broadcast`.
    async fn chain(broadcast: &'static str) -> MockServer {
        start_mock(move |method, path, _| match method {
            "GET" if path.starts_with("/cosmos/auth/v1beta1/accounts/") => {
                (200, account_body(5, 2))
            }
            "POST" => (200, broadcast.to_string()),
            _ => (404, r#"{"code": 5, "message": "not found"}"#.to_string()),
        })
        .await
    }

    fn broadcast_tx(body: &str) -> SignedTransaction {
        let request: Value = serde_json::from_str(body).unwrap();
        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["method"], "broadcast_tx_commit");
        let tx = STANDARD
            .decode(request["params"]["tx"].as_str().unwrap())
            .unwrap();
        serde_json::from_slice(&tx).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_account() {
        let server = chain("{}").await;
        let node = AkashNode::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        let info = node.resolve_account(wallet.address()).await.unwrap();
        assert_eq!(
            info,
            AccountInfo {
                address: wallet.address().clone(),
                account_number: 5,
                sequence: 2,
            }
        );
        assert_eq!(
            server.requests()[0].path,
            format!("/cosmos/auth/v1beta1/accounts/{}", wallet.address())
        );
        let tx_info = info.transaction_info(CHAIN_ID);
        assert_eq!(tx_info, TransactionInfo::new(CHAIN_ID, 5, 2));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let server = start_mock(|_, _, _| {
            (
                404,
                r#"{"code": 5, "message": "rpc error: code = NotFound desc = account not found", "details": []}"#
                    .to_string(),
            )
        })
        .await;
        let node = AkashNode::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        assert_eq!(node.fetch_account(wallet.address()).await.unwrap(), None);
        assert_eq!(
            node.resolve_account(wallet.address()).await.unwrap_err(),
            AccountError::UnknownAccount(wallet.address().clone())
        );

        let client = AkashClient::from_node(node);
        let err = client
            .create_deployment(&wallet, &spec(), "10000000uakt")
            .await
            .unwrap_err();
        assert_eq!(err, Error::UnknownAccount(wallet.address().clone()));
        assert!(!err.is_retryable());
        assert!(server.methods().iter().all(|m| m == "GET"));
    }

    #[tokio::test]
    async fn test_rest_url_with_path_prefix() {
        let server = start_mock(|_, path, _| {
            if path.starts_with("/akash-rest/cosmos/auth/v1beta1/accounts/") {
                (200, account_body(5, 2))
            } else if path.starts_with("/akash-rest/akash/provider/v1beta3/providers") {
                (200, r#"{"providers": []}"#.to_string())
            } else {
                (404, r#"{"code": 5, "message": "not found"}"#.to_string())
            }
        })
        .await;
        let wallet = Wallet::from_private_key(KEY).unwrap();

        for rest_url in [
            format!("{}/akash-rest", server.url),
            format!("{}/akash-rest/", server.url),
        ] {
            let node = AkashNode::new(config(&server.url).with_rest_url(rest_url)).unwrap();
            let info = node.resolve_account(wallet.address()).await.unwrap();
            assert_eq!((info.account_number, info.sequence), (5, 2));
            assert_eq!(
                node.fetch_providers().await.unwrap(),
                serde_json::json!({"providers": []})
            );
        }
        assert!(server
            .requests()
            .iter()
            .all(|r| r.path.starts_with("/akash-rest/")));
    }

    #[tokio::test]
    async fn test_gateway_not_found_code() {
        let server = start_mock(|_, _, _| {
            (500, r#"{"code": 5, "message": "key not found"}"#.to_string())
        })
        .await;
        let node = AkashNode::new(config(&server.url)).unwrap();
        let address = AccountAddress::new("akash", [3; 20]).unwrap();
        assert_eq!(node.fetch_account(&address).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_http_failure() {
        let server = start_mock(|_, _, _| (502, "bad gateway".to_string())).await;
        let node = AkashNode::new(config(&server.url)).unwrap();
        let address = AccountAddress::new("akash", [3; 20]).unwrap();

        let err = node.fetch_account(&address).await.unwrap_err();
        let NetworkError::Status {
            endpoint, status, ..
        } = &err
        else {
            panic!("Expected status error, got {err:?}");
        };
        assert_eq!(*status, 502);
        assert_eq!(
            endpoint,
            &format!("{}/cosmos/auth/v1beta1/accounts/{address}", server.url)
        );
        assert!(Error::from(err).is_retryable());
        assert!(matches!(
            node.fetch_providers().await,
            Err(NetworkError::Status { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let url = closed_url().await;
        let node = AkashNode::new(config(&url)).unwrap();
        let address = AccountAddress::new("akash", [3; 20]).unwrap();

        let err = node.resolve_account(&address).await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::Network(NetworkError::Transport { .. })
        ));
        assert!(Error::from(err).is_retryable());
        assert!(!node.health_check().await);
    }

    #[tokio::test]
    async fn test_timeout() {
        let url = start_silent().await;
        let node = AkashNode::new(config(&url).with_timeout(Duration::from_millis(200))).unwrap();
        let address = AccountAddress::new("akash", [3; 20]).unwrap();
        assert!(matches!(
            node.fetch_account(&address).await,
            Err(NetworkError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_queries() {
        let server = start_mock(|_, path, _| {
            if path == "/cosmos/base/tendermint/v1beta1/node_info" {
                (200, r#"{"default_node_info": {"network": "akashnet-2"}}"#.to_string())
            } else {
                (200, format!(r#"{{"path": "{path}"}}"#))
            }
        })
        .await;
        let node = AkashNode::new(config(&server.url)).unwrap();
        let owner = AccountAddress::new("akash", [1; 20]).unwrap();
        let provider = AccountAddress::new("akash", [2; 20]).unwrap();

        let filter = MarketFilter {
            owner: Some(owner.clone()),
            dseq: Some(12),
            state: Some("open".to_string()),
            ..Default::default()
        };
        let bids = node.fetch_bids(&filter).await.unwrap();
        assert_eq!(
            bids["path"],
            format!("/akash/market/v1beta4/bids/list?owner={owner}&dseq=12&state=open")
        );
        let leases = node
            .fetch_leases(&MarketFilter {
                provider: Some(provider.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            leases["path"],
            format!("/akash/market/v1beta4/leases/list?provider={provider}")
        );

        let deployments = node
            .fetch_deployments(&DeploymentFilter {
                owner: Some(owner.clone()),
                state: Some("active".to_string()),
                dseq: None,
            })
            .await
            .unwrap();
        assert_eq!(
            deployments["path"],
            format!("/akash/deployment/v1beta3/deployments?owner={owner}&state=active")
        );
        assert_eq!(
            node.fetch_deployment(&owner, 77).await.unwrap()["path"],
            format!("/akash/deployment/v1beta3/deployments/{owner}/77")
        );
        assert_eq!(
            node.fetch_providers().await.unwrap()["path"],
            "/akash/provider/v1beta3/providers"
        );
        assert_eq!(
            node.fetch_provider(&provider).await.unwrap()["path"],
            format!("/akash/provider/v1beta3/providers/{provider}")
        );
        assert!(node.health_check().await);
        assert!(server.methods().iter().all(|m| m == "GET"));
    }

    #[tokio::test]
    async fn test_broadcast_end_to_end() {
        let server = chain(r#"{"result":{"hash":"ABCD"}}"#).await;
        let node = AkashNode::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        let message = MessageBuilder::default()
            .build_create_deployment(wallet.address().as_ref(), &spec(), "10000000uakt")
            .unwrap();
        let tx_info = TransactionInfo::new(CHAIN_ID, 5, 2);
        let signed = TransactionAssembler::from_config(node.config())
            .assemble(&wallet, vec![message], &tx_info, 200_000)
            .unwrap()
            .sign(&wallet, &tx_info)
            .unwrap();
        let result = node.broadcaster().unwrap().broadcast(&signed).await.unwrap();
        assert_eq!(result.hash, "ABCD");

        let [request] = server.requests().try_into().unwrap();
        assert_eq!(request.method, "POST");
        let sent = broadcast_tx(&request.body);
        assert_eq!(sent, signed);
        sent.verify(CHAIN_ID, 5).unwrap();
    }

    #[tokio::test]
    async fn test_client_submit() {
        let server = chain(
            r#"{"jsonrpc": "2.0", "id": 1, "result": {"hash": "ABCD", "height": "1234",
                "check_tx": {"code": 0}, "deliver_tx": {"code": 0, "gas_used": "90000", "gas_wanted": "300000"}}}"#,
        )
        .await;
        let client = AkashClient::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        let result = client
            .create_deployment(&wallet, &spec(), "10000000uakt")
            .await
            .unwrap();
        assert_eq!(result.hash, "ABCD");
        assert_eq!(result.height, Some(1234));
        assert_eq!(result.gas_used, Some(90_000));
        assert_eq!(server.methods(), ["GET", "POST"]);

        let sent = broadcast_tx(&server.requests()[1].body);
        assert_eq!(sent.auth_info.signer_infos[0].sequence, 2);
        assert_eq!(sent.auth_info.fee.gas_limit, 300_000);
        assert_eq!(sent.auth_info.fee.amount[0].to_string(), "7500uakt");
        sent.verify(CHAIN_ID, 5).unwrap();
    }

    #[tokio::test]
    async fn test_client_market_operations() {
        let server = chain(r#"{"result":{"hash":"ABCD"}}"#).await;
        let client = AkashClient::new(config(&server.url)).unwrap();
        let tenant = Wallet::from_private_key(KEY).unwrap();
        let provider = Wallet::from_private_key(
            "2222222222222222222222222222222222222222222222222222222222222222",
        )
        .unwrap();
        let order = OrderId {
            owner: tenant.address().clone(),
            dseq: 100,
            gseq: 1,
            oseq: 1,
        };

        client.create_bid(&provider, &order, "50uakt").await.unwrap();
        let bid_id = BidId::new(&order, provider.address().clone());
        client.create_lease(&tenant, &bid_id).await.unwrap();
        client.close_deployment(&tenant, 100).await.unwrap();

        let sent: Vec<_> = server
            .requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .map(|r| broadcast_tx(&r.body))
            .collect();
        let types: Vec<_> = sent
            .iter()
            .map(|tx| tx.body.messages[0].type_url())
            .collect();
        assert_eq!(
            types,
            [
                "/akash.market.v1beta4.MsgCreateBid",
                "/akash.market.v1beta4.MsgCreateLease",
                "/akash.deployment.v1beta3.MsgCloseDeployment",
            ]
        );
        assert_eq!(sent[0].auth_info.fee.gas_limit, 200_000);

        assert!(matches!(
            client.create_bid(&provider, &order, "50uatom").await,
            Err(Error::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_chain_rejection() {
        let server = chain(
            r#"{"result": {"hash": "ABCD", "height": "0",
                "check_tx": {"code": 32, "codespace": "sdk", "log": "account sequence mismatch, expected 3, got 2: incorrect account sequence"}}}"#,
        )
        .await;
        let client = AkashClient::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        let err = client.close_deployment(&wallet, 1).await.unwrap_err();
        let Error::ChainRejection(rejection) = &err else {
            panic!("Expected rejection, got {err:?}");
        };
        assert_eq!(rejection.stage, RejectionStage::CheckTx);
        assert_eq!(rejection.code, 32);
        assert!(rejection.message.contains("incorrect account sequence"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rpc_error_response() {
        let server = chain(
            r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": -32603, "message": "Internal error", "data": "tx already exists in cache"}}"#,
        )
        .await;
        let client = AkashClient::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        let err = client.close_deployment(&wallet, 1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ChainRejection(ChainRejection {
                stage: RejectionStage::Rpc,
                code: -32603,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_loose_rpc_error_is_rejection() {
        for body in [
            r#"{"error": "tx already exists in cache"}"#,
            r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": "-32603", "message": "Internal error"}}"#,
        ] {
            let server = chain(body).await;
            let client = AkashClient::new(config(&server.url)).unwrap();
            let wallet = Wallet::from_private_key(KEY).unwrap();

            let err = client.close_deployment(&wallet, 1).await.unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::ChainRejection(ChainRejection {
                        stage: RejectionStage::Rpc,
                        ..
                    })
                ),
                "{body}: {err:?}"
            );
            assert!(!err.is_retryable());
        }
    }

    #[tokio::test]
    async fn test_broadcast_http_failure() {
        let server = start_mock(|method, _, _| match method {
            "GET" => (200, account_body(5, 2)),
            _ => (503, "unavailable".to_string()),
        })
        .await;
        let client = AkashClient::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        let err = client.close_deployment(&wallet, 1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::Status { status: 503, .. })
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_rpc_fails_fast() {
        let server = chain("{}").await;
        let client = AkashClient::new(config(&server.url).without_rpc()).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        assert_eq!(
            client.close_deployment(&wallet, 1).await.unwrap_err(),
            Error::MissingCapability("rpc endpoint")
        );
        assert!(matches!(
            client.node().broadcaster(),
            Err(Error::MissingCapability(_))
        ));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_watch_only_fails_fast() {
        let server = chain("{}").await;
        let client = AkashClient::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();
        let watch_only = Wallet::from_public_key(*wallet.public_key(), "akash").unwrap();

        assert_eq!(
            client.close_deployment(&watch_only, 1).await.unwrap_err(),
            Error::Signing(SigningError::MissingPrivateKey)
        );
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_same_account_submissions_serialized() {
        let server = chain(r#"{"result":{"hash":"ABCD"}}"#).await;
        let client = AkashClient::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();

        let (first, second) = tokio::join!(
            client.close_deployment(&wallet, 1),
            client.close_deployment(&wallet, 2),
        );
        first.unwrap();
        second.unwrap();
        assert_eq!(server.methods(), ["GET", "POST", "GET", "POST"]);
    }

    #[tokio::test]
    async fn test_builder() {
        let server = chain("{}").await;
        let node = AkashNode::new(config(&server.url)).unwrap();
        let wallet = Wallet::from_private_key(KEY).unwrap();
        let builder = MessageBuilder::default();
        let close = builder
            .build_close_deployment(wallet.address().as_ref(), 1)
            .unwrap();

        let (tx, tx_info) = TransactionBuilder::new(node.clone())
            .add_message(close.clone())
            .memo("closing")
            .gas_limit(150_000)
            .timeout_height(99)
            .build(&wallet)
            .await
            .unwrap();
        assert_eq!(
            tx_info,
            TransactionInfo::new(CHAIN_ID, 5, 2)
                .memo("closing")
                .timeout_height(99)
        );
        assert_eq!(tx.body.messages, vec![close.clone()]);
        assert_eq!(tx.auth_info.fee.gas_limit, 150_000);
        assert_eq!(server.requests().len(), 1);

        let (tx, tx_info) = TransactionBuilder::new(node.clone())
            .add_message(close.clone())
            .account(7, 9)
            .build(&wallet)
            .await
            .unwrap();
        assert_eq!((tx_info.account_number, tx_info.sequence), (7, 9));
        assert_eq!(tx.auth_info.fee.gas_limit, node.config().default_gas_limit);
        assert_eq!(server.requests().len(), 1);

        assert_eq!(
            TransactionBuilder::new(node.clone())
                .build(&wallet)
                .await
                .unwrap_err(),
            TransactionBuilderError::Transaction(
                akash_devkit::transactions::TransactionError::EmptyTransaction
            )
        );
        assert_eq!(
            TransactionBuilder::new(node.clone())
                .add_message(close.clone())
                .account(7, 9)
                .fee(Coin::new(5, "uatom"))
                .build(&wallet)
                .await
                .unwrap_err(),
            TransactionBuilderError::Transaction(
                akash_devkit::transactions::TransactionError::Amount(AmountError::WrongDenom {
                    expected: "uakt".to_string(),
                    got: "uatom".to_string(),
                })
            )
        );
        let stranger = Wallet::from_private_key(
            "2222222222222222222222222222222222222222222222222222222222222222",
        )
        .unwrap();
        assert!(matches!(
            TransactionBuilder::new(node)
                .add_message(close)
                .build(&stranger)
                .await,
            Err(TransactionBuilderError::ForeignMessage { .. })
        ));
    }
}
