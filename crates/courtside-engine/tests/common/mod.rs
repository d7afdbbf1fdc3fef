//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use courtside_core::{CourtDirectory, Credential, CredentialSet, Region, TimeSlotRequest};
use courtside_providers::testing::ScriptedTransport;
use courtside_providers::{DobongProvider, HttpResponse, NowonProvider, ProviderConfig};

pub const NOWON_URL: &str = "https://nowon.test/";
pub const DOBONG_URL: &str = "https://dobong.test/";

pub fn directory() -> Arc<CourtDirectory> {
    Arc::new(CourtDirectory::builtin())
}

pub fn nowon(transport: &Arc<ScriptedTransport>) -> NowonProvider {
    NowonProvider::with_transport(
        transport.clone(),
        ProviderConfig::new(NOWON_URL).unwrap(),
        directory(),
    )
}

pub fn dobong(transport: &Arc<ScriptedTransport>) -> DobongProvider {
    DobongProvider::with_transport(
        transport.clone(),
        ProviderConfig::new(DOBONG_URL).unwrap(),
        directory(),
    )
}

pub fn credentials() -> CredentialSet {
    CredentialSet::new()
        .with(Credential::new(Region::A, "kim", "pw-a"))
        .with(Credential::new(Region::B, "lee", "pw-b"))
}

/// Scripts a successful Nowon login.
pub fn nowon_login(transport: &ScriptedTransport) {
    transport.route(
        "/member/login.do",
        HttpResponse::new(200, "<form></form>").with_header("Set-Cookie", "JSESSIONID=seed; Path=/"),
    );
    transport.route(
        "/member/loginProc.do",
        HttpResponse::new(302, "")
            .with_header("Location", "/rent/main.do")
            .with_header("Set-Cookie", "AUTH=ok; Path=/; HttpOnly"),
    );
    transport.route("/rent/main.do", HttpResponse::new(200, "main"));
    transport.route("/mypage/myInfo.do", HttpResponse::new(200, "<a>로그아웃</a>"));
}

/// Scripts a successful Dobong login.
pub fn dobong_login(transport: &ScriptedTransport) {
    transport.route("/login/loginForm.do", HttpResponse::new(200, "<form></form>"));
    transport.route(
        "/login/loginAction.do",
        HttpResponse::new(200, "ok").with_header("Set-Cookie", "SID=b1; Path=/"),
    );
    transport.route("/mypage/reserveList.do", HttpResponse::new(200, "<a>로그아웃</a>"));
}

/// Scripts the Nowon confirm page for `court_code`, handing out `vo` as the
/// first echo token.
pub fn nowon_confirm(transport: &ScriptedTransport, court_code: &str, vo: &str, price: u64) {
    transport.route(
        format!("courtCd={}&", court_code),
        HttpResponse::new(
            200,
            format!(
                r#"<script>fnSave("voStr={}&timeStr=13:00~14:00~{}~코트");</script>
                   <input type="hidden" name="userNm" value="김철수">
                   <input type="hidden" name="userHp" value="01012345678">
                   <input type="hidden" name="totalPrice" value="{}">"#,
                vo, court_code, price
            ),
        ),
    );
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
}

pub fn slot(court: &str, day: u32, start: &str, end: &str) -> TimeSlotRequest {
    let directory = CourtDirectory::builtin();
    TimeSlotRequest {
        court_id: court.into(),
        date: date(day),
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        provider_court_code: directory
            .court(court)
            .map(|c| c.provider_code.clone())
            .unwrap_or_default(),
    }
}
