mod common;

use common::Fixture;

/// Scenario 1: CREATE round-robins across active storage servers.
#[tokio::test]
async fn create_round_robins_across_storage_servers() {
    let fixture = Fixture::spawn(2).await;

    let first = fixture.command("alice", "CREATE one.txt").await;
    assert!(first.starts_with("Success:"), "unexpected reply: {first}");
    let second = fixture.command("alice", "CREATE two.txt").await;
    assert!(second.starts_with("Success:"), "unexpected reply: {second}");

    let info_one = fixture.command("alice", "INFO one.txt").await;
    let info_two = fixture.command("alice", "INFO two.txt").await;
    let ss_of = |info: &str| -> String {
        info.lines()
            .find(|l| l.starts_with("Storage Servers"))
            .and_then(|l| l.split(':').nth(1))
            .unwrap_or_default()
            .trim()
            .to_string()
    };
    assert_ne!(ss_of(&info_one), ss_of(&info_two), "round robin should spread files across both servers");
}

/// Scenario 2: ACL grants made through the name server take effect on the
/// owning storage server immediately, without the grantee reconnecting.
#[tokio::test]
async fn addaccess_through_name_server_unlocks_read_on_storage_server() {
    let fixture = Fixture::spawn(1).await;
    let created = fixture.command("alice", "CREATE secret.txt").await;
    assert!(created.starts_with("Success:"), "unexpected reply: {created}");

    let denied = fixture.command("bob", "READ secret.txt").await;
    assert!(denied.contains("Access denied"), "expected bob denied before grant: {denied}");

    let grant = fixture.command("alice", "ADDACCESS -R secret.txt bob").await;
    assert!(grant.starts_with("Success:"), "unexpected grant reply: {grant}");

    let allowed = fixture.command("bob", "READ secret.txt").await;
    assert!(!allowed.contains("Access denied"), "bob should read after the grant: {allowed}");
}

/// VIEW fans out across every active storage server and labels each block.
#[tokio::test]
async fn view_fans_out_to_every_active_server() {
    let fixture = Fixture::spawn(2).await;
    fixture.command("alice", "CREATE one.txt").await;
    fixture.command("alice", "CREATE two.txt").await;

    let view = fixture.command("alice", "VIEW").await;
    assert!(view.contains("StorageServer 1"), "expected server 1's section: {view}");
    assert!(view.contains("StorageServer 2"), "expected server 2's section: {view}");
}
