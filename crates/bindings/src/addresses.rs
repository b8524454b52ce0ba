//! Per-network address book

use std::fmt;

use alloy_primitives::{address, Address};

use crate::{
    AccountingOracle, Acl, Agent, Burner, DualGovernance, EasyTrack, EmergencyProtectedTimelock, Finance,
    HashConsensus, Kernel, Lido, NodeOperatorsRegistry, OracleReportSanityChecker, StakingRouter, TokenManager,
    ValidatorsExitBusOracle, Voting, WithdrawalQueue,
};

/// Supported networks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Holesky,
}

impl From<&str> for Network {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "holesky" | "holesky-fork" => Self::Holesky,
            _ => Self::Mainnet,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Holesky => write!(f, "holesky"),
        }
    }
}

/// Deployed contracts of one network
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contracts {
    pub network: Network,
    pub kernel: Address,
    pub acl: Address,
    pub voting: Address,
    pub token_manager: Address,
    pub agent: Address,
    pub finance: Address,
    pub ldo_token: Address,
    pub lido: Address,
    pub withdrawal_queue: Address,
    pub withdrawal_vault: Address,
    pub el_rewards_vault: Address,
    pub burner: Address,
    pub oracle_report_sanity_checker: Address,
    pub staking_router: Address,
    pub node_operators_registry: Address,
    pub accounting_oracle: Address,
    /// Resolved through `getConsensusContract()` when unknown
    pub hash_consensus_for_accounting_oracle: Option<Address>,
    pub validators_exit_bus_oracle: Address,
    pub hash_consensus_for_validators_exit_bus_oracle: Option<Address>,
    pub easy_track: Address,
    pub dual_governance: Option<Address>,
    pub emergency_protected_timelock: Option<Address>,
    pub matic_token: Option<Address>,
    /// LDO holders that can pass a vote together on a fork
    pub ldo_vote_executors: &'static [Address],
}

const MAINNET: Contracts = Contracts {
    network: Network::Mainnet,
    kernel: address!("b8FFC3Cd6e7Cf5a098A1c92F48009765B24088Dc"),
    acl: address!("9895F0F17cc1d1891b6f18ee0b483B6f221b37Bb"),
    voting: address!("2e59A20f205bB85a89C53f1936454680651E618e"),
    token_manager: address!("f73a1260d222f447210581DDf212D915c09a3249"),
    agent: address!("3e40D73EB977Dc6a537aF587D48316feE66E9C8c"),
    finance: address!("B9E5CBB9CA5b0d659238807E84D0176930753d86"),
    ldo_token: address!("5A98FcBEA516Cf06857215779Fd812CA3beF1B32"),
    lido: address!("ae7ab96520DE3A18E5e111B5EaAb095312D7fE84"),
    withdrawal_queue: address!("889edc2edab5f40e902b864ad4d7ade8e412f9b1"),
    withdrawal_vault: address!("b9d7934878b5fb9610b3fe8a5e441e8fad7e293f"),
    el_rewards_vault: address!("388c818ca8b9251b393131c08a736a67ccb19297"),
    burner: address!("d15a672319cf0352560ee76d9e89eab0889046d3"),
    oracle_report_sanity_checker: address!("6232397ebac4f5772e53285b26c47914e9461e75"),
    staking_router: address!("FdDf38947aFB03C621C71b06C9C70bce73f12999"),
    node_operators_registry: address!("55032650b14df07b85bF18A3a3eC8E0Af2e028d5"),
    accounting_oracle: address!("852deD011285fe67063a08005c71a85690503Cee"),
    hash_consensus_for_accounting_oracle: Some(address!("D624B08C83bAECF0807Dd2c6880C3154a5F0B288")),
    validators_exit_bus_oracle: address!("0de4ea0184c2ad0baca7183356aea5b8d5bf5c6e"),
    hash_consensus_for_validators_exit_bus_oracle: Some(address!("7fadb6358950c5faa66cb5eb8ee5147de3df355a")),
    easy_track: address!("F0211b7660680B49De1A7E9f25C65660F0a13Fea"),
    dual_governance: Some(address!("C1db28B3301331277e307FDCfF8DE28242A4486E")),
    emergency_protected_timelock: Some(address!("CE0425301C85c5Ea2A0873A2dEe44d78E02D2316")),
    matic_token: Some(address!("7d1afa7b718fb893db30a3abc0cfc608aacfebb0")),
    ldo_vote_executors: &[
        address!("3e40d73eb977dc6a537af587d48316fee66e9c8c"),
        address!("b8d83908aab38a159f3da47a59d84db8e1838712"),
        address!("a2dfc431297aee387c05beef507e5335e684fbcd"),
    ],
};

const HOLESKY: Contracts = Contracts {
    network: Network::Holesky,
    kernel: address!("3b03f75Ec541Ca11a223bB58621A3146246E1644"),
    acl: address!("fd1E42595CeC3E83239bf8dFc535250e7F48E0bC"),
    voting: address!("dA7d2573Df555002503F29aA4003e398d28cc00f"),
    token_manager: address!("Faa1692c6eea8eeF534e7819749aD93a1420379A"),
    agent: address!("E92329EC7ddB11D25e25b3c21eeBf11f15eB325d"),
    finance: address!("f0F281E5d7FBc54EAFcE0dA225CDbde04173AB16"),
    ldo_token: address!("14ae7daeecdf57034f3E9db8564e46Dba8D97344"),
    lido: address!("3F1c547b21f65e10480dE3ad8E19fAAC46C95034"),
    withdrawal_queue: address!("c7cc160b58f8bb0bac94b80847e2cf2800565c50"),
    withdrawal_vault: address!("f0179dec45a37423ead4fad5fcb136197872ead9"),
    el_rewards_vault: address!("e73a3602b99f1f913e72f8bdcbc235e206794ac8"),
    burner: address!("4e46bd7147ccf666e1d73a3a456fc7a68de82eca"),
    oracle_report_sanity_checker: address!("80d1b1ff6e84134404aba18a628347960c38cca7"),
    staking_router: address!("d6EbF043D30A7fe46D1Db32BA90a0A51207FE229"),
    node_operators_registry: address!("595F64Ddc3856a3b5Ff4f4CC1d1fb4B46cFd2bAC"),
    accounting_oracle: address!("4E97A3972ce8511D87F334dA17a2C332542a5246"),
    hash_consensus_for_accounting_oracle: None,
    validators_exit_bus_oracle: address!("ffddf7025410412deaa05e3e1ce68fe53208afcb"),
    hash_consensus_for_validators_exit_bus_oracle: None,
    easy_track: address!("1763b9ED3586B08AE796c7787811a2E1bc16163a"),
    dual_governance: None,
    emergency_protected_timelock: None,
    matic_token: None,
    ldo_vote_executors: &[
        address!("aa6bfbcd634ee744cb8fe522b29add23124593d3"),
        address!("ba59a84c6440e8cccfdb5448877e26f1a431fc8b"),
        address!("1d835790d93a28fb30d998c0cb27426e5d2d7c8c"),
    ],
};

impl Contracts {
    pub const fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => MAINNET,
            Network::Holesky => HOLESKY,
        }
    }

    pub const fn kernel(&self) -> Kernel {
        Kernel::new(self.kernel)
    }

    pub const fn acl(&self) -> Acl {
        Acl::new(self.acl)
    }

    pub const fn voting(&self) -> Voting {
        Voting::new(self.voting)
    }

    pub const fn token_manager(&self) -> TokenManager {
        TokenManager::new(self.token_manager)
    }

    pub const fn agent(&self) -> Agent {
        Agent::new(self.agent)
    }

    pub const fn finance(&self) -> Finance {
        Finance::new(self.finance)
    }

    pub const fn lido(&self) -> Lido {
        Lido::new(self.lido)
    }

    pub const fn withdrawal_queue(&self) -> WithdrawalQueue {
        WithdrawalQueue::new(self.withdrawal_queue)
    }

    pub const fn burner(&self) -> Burner {
        Burner::new(self.burner)
    }

    pub const fn oracle_report_sanity_checker(&self) -> OracleReportSanityChecker {
        OracleReportSanityChecker::new(self.oracle_report_sanity_checker)
    }

    pub const fn staking_router(&self) -> StakingRouter {
        StakingRouter::new(self.staking_router)
    }

    pub const fn node_operators_registry(&self) -> NodeOperatorsRegistry {
        NodeOperatorsRegistry::new(self.node_operators_registry)
    }

    pub const fn accounting_oracle(&self) -> AccountingOracle {
        AccountingOracle::new(self.accounting_oracle)
    }

    pub fn hash_consensus_for_accounting_oracle(&self) -> Option<HashConsensus> {
        self.hash_consensus_for_accounting_oracle.map(HashConsensus::new)
    }

    pub const fn validators_exit_bus_oracle(&self) -> ValidatorsExitBusOracle {
        ValidatorsExitBusOracle::new(self.validators_exit_bus_oracle)
    }

    pub fn hash_consensus_for_validators_exit_bus_oracle(&self) -> Option<HashConsensus> {
        self.hash_consensus_for_validators_exit_bus_oracle.map(HashConsensus::new)
    }

    pub const fn easy_track(&self) -> EasyTrack {
        EasyTrack::new(self.easy_track)
    }

    pub fn dual_governance(&self) -> Option<DualGovernance> {
        self.dual_governance.map(DualGovernance::new)
    }

    pub fn emergency_protected_timelock(&self) -> Option<EmergencyProtectedTimelock> {
        self.emergency_protected_timelock.map(EmergencyProtectedTimelock::new)
    }
}

impl Default for Contracts {
    fn default() -> Self {
        MAINNET
    }
}
