use super::quorums::*;

#[test]
fn test_quorum() {
    let cases: Vec<(usize, usize)> = vec![
        (1, 1),
        (2, 2),
        (3, 2),
        (4, 3),
        (5, 3),
        (6, 4),
        (7, 4),
        (8, 5),
        (9, 5),
    ];

    for (n_participants, q) in cases {
        assert_eq!(q, quorum(n_participants), "quorum n={}", n_participants);
    }
}
